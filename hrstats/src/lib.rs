//! # hrstats: visit and download statistics for humanitarian response entities
//!
//! `hrstats` joins two remote services into summary tables:
//!
//! - the **humanitarian response directory**, a JSON API listing operations, spaces, bundles and
//!   clusters with their labels and countries
//! - a **Matomo** analytics instance, whose tracked page views carry custom variables naming the
//!   entity and download type they belong to
//!
//! For each entity it reports visits, downloads and downloads per type (document, infographic,
//! dataset, assessment), once globally and once restricted to visitors from the entity's own
//! country.
//!
//! ## Architecture
//!
//! - [`directory`]: directory client ([`directory::DirectoryReqwest`] over HTTP, [`directory::StaticDirectory`] in memory)
//! - [`analytics`]: analytics queries ([`analytics::MatomoReqwest`], [`analytics::StaticAnalytics`])
//! - [`segment`]: segment expressions selecting the page views of one entity
//! - [`summary`]: the [`summary::Aggregator`] composing the above into rows
//! - [`table`]: the ordered [`table::SummaryTable`] handed to renderers
//! - [`api`]: HTTP routes over the aggregator
//!
//! Remote failures never fail a summary. They are logged and the affected cells degrade to
//! zeros or absent labels.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the HTTP API on the configured host and port
//! hrstats -f config.yaml
//!
//! # One-off summary of operation 42 on site 1
//! hrstats summary --site 1 --period day --date 2024-01-01 --kind operation --id 42
//! ```

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod errors;
pub mod segment;
pub mod summary;
pub mod table;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_utils;

use axum::{Router, routing::get};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

use crate::analytics::MatomoReqwest;
use crate::api::handlers;
use crate::directory::DirectoryReqwest;
use crate::summary::Aggregator;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .aggregator(aggregator)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub aggregator: Aggregator,
}

/// Aggregator over the remote directory and analytics instance named in `config`.
pub fn build_aggregator(config: &Config) -> anyhow::Result<Aggregator> {
    let directory = DirectoryReqwest::new(&config.directory)?;
    let analytics = MatomoReqwest::new(&config.analytics)?;
    debug!("Directory client: {:?}, analytics client: {:?}", directory, analytics);

    Ok(Aggregator::builder()
        .directory(Arc::new(directory))
        .analytics(Arc::new(analytics))
        .concurrency(config.summary.concurrency)
        .build())
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/sites/{site_id}/summary", get(handlers::summary::get_overview))
        .route("/sites/{site_id}/summary/{kind}", get(handlers::summary::get_category_summary))
        .route("/sites/{site_id}/summary/{kind}/{entity_id}", get(handlers::summary::get_entity_summary));

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// The HTTP server.
///
/// 1. **Create**: [`Application::new`] builds the remote clients and the router
/// 2. **Serve**: [`Application::serve`] binds to the configured address and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let aggregator = build_aggregator(&config)?;
        Ok(Self::with_aggregator(config, aggregator))
    }

    /// Serve summaries from an already assembled aggregator.
    pub fn with_aggregator(config: Config, aggregator: Aggregator) -> Self {
        let state = AppState::builder().config(config.clone()).aggregator(aggregator).build();
        Self {
            router: build_router(state),
            config,
        }
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("hrstats listening on http://{}, available at http://localhost:{}", bind_addr, self.config.port);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
