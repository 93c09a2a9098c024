//! In-memory analytics backend for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{AnalyticsQuery, MetricSet};
use crate::segment::Segment;
use crate::types::{Outcome, QueryScope};

/// Record of a query made to the static backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsCall {
    pub scope: QueryScope,
    pub segment: Segment,
    pub metrics: Vec<String>,
}

#[derive(Debug, Clone)]
enum StaticResponse {
    Metrics(MetricSet),
    Fail,
}

/// A static implementation of `AnalyticsQuery` answering from predefined rows keyed by segment.
///
/// Segments with no configured row behave like a host with no matching visits: every requested
/// metric comes back as zero. The scope is recorded but not used for lookups.
///
/// # Example
/// ```ignore
/// let analytics = StaticAnalytics::new()
///     .with_metrics(Segment::base(EntityKind::Operation, &id), MetricSet::new().with("nb_visits", 100));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticAnalytics {
    by_segment: HashMap<Segment, StaticResponse>,
    calls: Arc<Mutex<Vec<AnalyticsCall>>>,
}

impl StaticAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(mut self, segment: Segment, metrics: MetricSet) -> Self {
        self.by_segment.insert(segment, StaticResponse::Metrics(metrics));
        self
    }

    /// Make queries for `segment` fail as if the host were unreachable.
    pub fn with_failure(mut self, segment: Segment) -> Self {
        self.by_segment.insert(segment, StaticResponse::Fail);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<AnalyticsCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl AnalyticsQuery for StaticAnalytics {
    async fn query(&self, scope: &QueryScope, segment: &Segment, metrics: &[&str]) -> Outcome<MetricSet> {
        self.calls.lock().push(AnalyticsCall {
            scope: *scope,
            segment: segment.clone(),
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
        });

        match self.by_segment.get(segment) {
            Some(StaticResponse::Metrics(row)) => Outcome::Found(row.project(metrics)),
            Some(StaticResponse::Fail) => Outcome::Failed(anyhow::anyhow!("static analytics: query for '{}' failed", segment)),
            None => Outcome::Found(MetricSet::zeroed(metrics)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{NB_DOWNLOADS, NB_VISITS};
    use crate::types::{EntityId, EntityKind, Period, ReportDate};

    fn scope() -> QueryScope {
        QueryScope::new(1, Period::Day, ReportDate::Yesterday).unwrap()
    }

    #[tokio::test]
    async fn test_static_analytics_projects_configured_rows() {
        let segment = Segment::base(EntityKind::Operation, &EntityId::new("42"));
        let analytics = StaticAnalytics::new()
            .with_metrics(segment.clone(), MetricSet::new().with(NB_VISITS, 100).with("bounce_count", 5));

        let metrics = analytics.query(&scope(), &segment, &[NB_VISITS, NB_DOWNLOADS]).await.found().unwrap();
        assert_eq!(metrics, MetricSet::new().with(NB_VISITS, 100).with(NB_DOWNLOADS, 0));

        let calls = analytics.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].segment, segment);
        assert_eq!(calls[0].metrics, vec![NB_VISITS.to_string(), NB_DOWNLOADS.to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_segment_is_zeroed() {
        let segment = Segment::raw("countryCode==NP");

        let zeroed = StaticAnalytics::new().query(&scope(), &segment, &[NB_VISITS, NB_DOWNLOADS]).await;
        assert_eq!(zeroed.found().unwrap(), MetricSet::zeroed(&[NB_VISITS, NB_DOWNLOADS]));
    }

    #[tokio::test]
    async fn test_configured_failure() {
        let segment = Segment::raw("customVariablePageName1==spaces;customVariablePageValue1=@1");
        let analytics = StaticAnalytics::new().with_failure(segment.clone());
        assert!(matches!(analytics.query(&scope(), &segment, &[NB_VISITS]).await, Outcome::Failed(_)));
        assert_eq!(analytics.call_count(), 1);
    }
}
