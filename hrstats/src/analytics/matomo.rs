//! Matomo (formerly Piwik) Reporting API adapter.
//!
//! Queries go through `API.get`, which merges the metrics of every reporting plugin into a single
//! flat row, so visit and download counts come back from one request.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{AnalyticsQuery, MetricSet};
use crate::config::AnalyticsConfig;
use crate::segment::Segment;
use crate::types::{Outcome, QueryScope};

/// Makes sure a url has a trailing slash.
///
/// Joining `/matomo` with `index.php` gives `/index.php`, while `/matomo/` gives
/// `/matomo/index.php`. Call this before calling `.join`.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// The concrete implementation of `AnalyticsQuery` against a Matomo instance.
#[derive(Clone)]
pub struct MatomoReqwest {
    client: Client,
    base_url: Url,
    token_auth: Option<String>,
    request_timeout: Duration,
}

impl std::fmt::Debug for MatomoReqwest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatomoReqwest")
            .field("base_url", &self.base_url)
            .field("token_auth", &self.token_auth.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl MatomoReqwest {
    pub fn new(config: &AnalyticsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create analytics HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token_auth: config.token_auth.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn query_url(&self, scope: &QueryScope, segment: &Segment, metrics: &[&str]) -> anyhow::Result<Url> {
        let mut url = ensure_slash(&self.base_url)
            .join("index.php")
            .map_err(|e| anyhow!("Failed to construct analytics URL: {}", e))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("module", "API")
                .append_pair("method", "API.get")
                .append_pair("format", "json")
                .append_pair("idSite", &scope.site_id.to_string())
                .append_pair("period", scope.period.as_str())
                .append_pair("date", &scope.date.to_string())
                .append_pair("segment", segment.as_str())
                .append_pair("columns", &metrics.join(","));
            if let Some(token) = &self.token_auth {
                query.append_pair("token_auth", token);
            }
        }

        Ok(url)
    }

    async fn try_query(&self, scope: &QueryScope, segment: &Segment, metrics: &[&str]) -> anyhow::Result<MetricSet> {
        let url = self.query_url(scope, segment, metrics)?;

        // reqwest errors print their url, and the url carries `token_auth`
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to make request to analytics API");
            return Err(anyhow!("Analytics API error: {} - {}", status, body));
        }

        let body_text = response.text().await.map_err(reqwest::Error::without_url)?;
        tracing::trace!("Analytics response body: {}", body_text);

        let body: Value = serde_json::from_str(&body_text).map_err(|e| {
            tracing::error!("Failed to parse analytics response as JSON. Error: {}", e);
            tracing::debug!("Response body was: {}", body_text);
            anyhow!("error decoding analytics response body: {}", e)
        })?;

        parse_row(body, metrics)
    }
}

/// Turn an `API.get` response into the requested metrics.
fn parse_row(body: Value, metrics: &[&str]) -> anyhow::Result<MetricSet> {
    match body {
        Value::Object(row) => {
            if row.get("result").and_then(Value::as_str) == Some("error") {
                let message = row.get("message").and_then(Value::as_str).unwrap_or("unknown error");
                return Err(anyhow!("Analytics API returned an error: {}", message));
            }
            Ok(MetricSet::from_json_row(&row).project(metrics))
        }
        // Older releases wrap the row in a one-element array, and answer `[]` when nothing matched
        Value::Array(rows) => match rows.into_iter().next() {
            Some(Value::Object(row)) => Ok(MetricSet::from_json_row(&row).project(metrics)),
            Some(other) => Err(anyhow!("Unexpected analytics row: {}", other)),
            None => Ok(MetricSet::zeroed(metrics)),
        },
        other => Err(anyhow!("Unexpected analytics response: {}", other)),
    }
}

#[async_trait]
impl AnalyticsQuery for MatomoReqwest {
    #[instrument(skip_all, fields(site_id = scope.site_id, period = %scope.period, date = %scope.date, segment = %segment))]
    async fn query(&self, scope: &QueryScope, segment: &Segment, metrics: &[&str]) -> Outcome<MetricSet> {
        match self.try_query(scope, segment, metrics).await {
            Ok(set) => {
                debug!(metrics = ?set, "Analytics query completed");
                Outcome::Found(set)
            }
            Err(e) => Outcome::Failed(e),
        }
    }
}
