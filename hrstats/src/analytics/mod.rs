//! Host analytics queries.
//!
//! A query selects a pre-aggregated metric scope with a (site, period, date, segment) tuple and
//! projects the requested metric columns. The host platform itself is not reimplemented here:
//! [`MatomoReqwest`] talks to its Reporting API over HTTP and [`StaticAnalytics`] answers from
//! memory.

mod in_memory;
mod matomo;

pub use in_memory::{AnalyticsCall, StaticAnalytics};
pub use matomo::MatomoReqwest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::segment::Segment;
use crate::types::{Outcome, QueryScope};

pub const NB_VISITS: &str = "nb_visits";
pub const NB_DOWNLOADS: &str = "nb_downloads";

/// A trait for querying metrics from the host analytics platform.
///
/// Implementations must report "no data for this scope" as `Found` with every requested metric
/// set to zero, and reserve `Failed` for calls that could not be completed.
#[async_trait]
pub trait AnalyticsQuery: Send + Sync {
    async fn query(&self, scope: &QueryScope, segment: &Segment, metrics: &[&str]) -> Outcome<MetricSet>;
}

/// Named numeric metrics for one segment and scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<String, u64>);

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every metric in `names` set to zero.
    pub fn zeroed(names: &[&str]) -> Self {
        Self(names.iter().map(|name| (name.to_string(), 0)).collect())
    }

    /// Read metrics out of a host API row, skipping values that are not non-negative numbers.
    ///
    /// The host reports most counters as JSON numbers, but some versions send numeric strings.
    pub fn from_json_row(row: &serde_json::Map<String, Value>) -> Self {
        Self(
            row.iter()
                .filter_map(|(name, value)| parse_metric(value).map(|v| (name.clone(), v)))
                .collect(),
        )
    }

    /// Keep only `names`, filling absent ones with zero.
    pub fn project(&self, names: &[&str]) -> Self {
        Self(names.iter().map(|name| (name.to_string(), self.get(name))).collect())
    }

    /// Value of `name`, zero when absent.
    pub fn get(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: u64) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: u64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

fn parse_metric(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_metric)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| s.parse::<f64>().ok().and_then(float_metric))
        }
        _ => None,
    }
}

fn float_metric(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_zeroed_and_project() {
        let zeroed = MetricSet::zeroed(&[NB_VISITS, NB_DOWNLOADS]);
        assert_eq!(zeroed.len(), 2);
        assert_eq!(zeroed.get(NB_VISITS), 0);

        let full = MetricSet::new().with(NB_VISITS, 12).with("bounce_count", 3);
        let projected = full.project(&[NB_VISITS, NB_DOWNLOADS]);
        assert_eq!(projected.get(NB_VISITS), 12);
        assert_eq!(projected.get(NB_DOWNLOADS), 0);
        assert!(projected.contains(NB_DOWNLOADS));
        assert!(!projected.contains("bounce_count"));
    }

    #[test]
    fn test_from_json_row_is_lenient() {
        let row = json!({
            "nb_visits": 100,
            "nb_downloads": "10",
            "avg_time_on_site": 12.6,
            "bounce_rate": "45%",
            "label": "ignored",
            "negative": -1
        });
        let metrics = MetricSet::from_json_row(row.as_object().unwrap());
        assert_eq!(metrics.get(NB_VISITS), 100);
        assert_eq!(metrics.get(NB_DOWNLOADS), 10);
        assert_eq!(metrics.get("avg_time_on_site"), 13);
        assert!(!metrics.contains("bounce_rate"));
        assert!(!metrics.contains("label"));
        assert!(!metrics.contains("negative"));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let metrics = MetricSet::new().with(NB_VISITS, 1).with(NB_DOWNLOADS, 2);
        assert_eq!(serde_json::to_value(&metrics).unwrap(), json!({"nb_downloads": 2, "nb_visits": 1}));
    }
}
