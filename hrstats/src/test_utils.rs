//! Shared fixtures for unit and handler tests.

use axum_test::TestServer;
use std::sync::Arc;

use crate::analytics::{MetricSet, NB_DOWNLOADS, NB_VISITS, StaticAnalytics};
use crate::config::Config;
use crate::directory::{EntityRecord, StaticDirectory};
use crate::segment::{DownloadType, Segment};
use crate::summary::Aggregator;
use crate::types::{EntityId, EntityKind, Period, QueryScope, ReportDate};
use crate::{AppState, build_router};

pub fn test_scope() -> QueryScope {
    QueryScope::new(1, Period::Day, "2024-01-01".parse::<ReportDate>().unwrap()).unwrap()
}

pub fn visits(visits: u64, downloads: u64) -> MetricSet {
    MetricSet::new().with(NB_VISITS, visits).with(NB_DOWNLOADS, downloads)
}

pub fn downloads(count: u64) -> MetricSet {
    MetricSet::new().with(NB_DOWNLOADS, count)
}

/// Operation 42 "Nepal Earthquake" in NP: 100 visits / 10 downloads globally, 30 / 4 in country.
pub fn nepal_backends() -> (StaticDirectory, StaticAnalytics) {
    let id = EntityId::new("42");
    let base = Segment::base(EntityKind::Operation, &id);
    let in_country = base.with_country("NP");

    let directory = StaticDirectory::new()
        .with_entity(EntityKind::Operation, EntityRecord::new("42", "Nepal Earthquake").with_country("NP"))
        .with_listing(EntityKind::Operation, vec![EntityRecord::new("42", "Nepal Earthquake")]);
    let analytics = StaticAnalytics::new()
        .with_metrics(base.clone(), visits(100, 10))
        .with_metrics(base.with_download_type(DownloadType::Document), downloads(4))
        .with_metrics(base.with_download_type(DownloadType::Infographic), downloads(1))
        .with_metrics(base.with_download_type(DownloadType::Dataset), downloads(3))
        .with_metrics(base.with_download_type(DownloadType::Assessment), downloads(2))
        .with_metrics(in_country.clone(), visits(30, 4))
        .with_metrics(in_country.with_download_type(DownloadType::Document), downloads(2))
        .with_metrics(in_country.with_download_type(DownloadType::Dataset), downloads(1));
    (directory, analytics)
}

pub fn test_aggregator(directory: StaticDirectory, analytics: StaticAnalytics) -> Aggregator {
    Aggregator::builder()
        .directory(Arc::new(directory))
        .analytics(Arc::new(analytics))
        .build()
}

pub fn create_test_app(directory: StaticDirectory, analytics: StaticAnalytics) -> TestServer {
    let state = AppState::builder()
        .config(Config::default())
        .aggregator(test_aggregator(directory, analytics))
        .build();
    TestServer::new(build_router(state)).expect("Failed to create test server")
}
