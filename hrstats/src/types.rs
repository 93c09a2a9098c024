//! Common type definitions shared by the directory client, the analytics adapter and the
//! aggregator.
//!
//! # Entities
//!
//! - [`EntityKind`]: directory category (operation, space, bundle, cluster)
//! - [`EntityId`]: opaque directory identifier, numeric or textual
//!
//! # Query scope
//!
//! - [`Period`] and [`ReportDate`]: host platform reporting window
//! - [`QueryScope`]: the (site, period, date) triple every metric in a row is computed over
//!
//! # Remote call results
//!
//! - [`Outcome`]: found / missing / failed, so callers decide whether to log or degrade

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// Directory entity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Operation,
    Space,
    Bundle,
    Cluster,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [EntityKind::Operation, EntityKind::Space, EntityKind::Bundle, EntityKind::Cluster];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Operation => "operation",
            EntityKind::Space => "space",
            EntityKind::Bundle => "bundle",
            EntityKind::Cluster => "cluster",
        }
    }

    /// Directory path segment, also the value tagged into the type custom variable.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Operation => "operations",
            EntityKind::Space => "spaces",
            EntityKind::Bundle => "bundles",
            EntityKind::Cluster => "clusters",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    /// Accepts the singular or plural form, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower || kind.plural() == lower)
            .ok_or_else(|| Error::bad_request(format!("Unknown entity type '{s}'. Expected one of: operation, space, bundle, cluster")))
    }
}

impl<'de> Deserialize<'de> for EntityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|e: Error| serde::de::Error::custom(e.to_string()))
    }
}

/// Characters with a meaning in the host segment grammar.
const SEGMENT_RESERVED: &[char] = &[';', ',', '=', '@', '!', '<', '>'];

/// Opaque directory identifier.
///
/// The directory hands out numeric ids, but nothing here relies on that: ids are carried as text
/// and concatenated verbatim into segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an id without any checks.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Validate an id coming from an outer surface (HTTP path, CLI flag).
    pub fn parse(id: &str) -> Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::bad_request("Entity id cannot be empty"));
        }
        if trimmed.contains(SEGMENT_RESERVED) {
            return Err(Error::bad_request(format!(
                "Entity id '{trimmed}' contains characters reserved by the segment syntax"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => EntityId(s),
            RawId::Number(n) => EntityId(n.to_string()),
        })
    }
}

/// Host platform reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
    Range,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
            Period::Range => "range",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            "range" => Ok(Period::Range),
            _ => Err(Error::bad_request(format!(
                "Invalid period '{s}'. Expected one of: day, week, month, year, range"
            ))),
        }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date argument understood by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportDate {
    Today,
    #[default]
    Yesterday,
    Day(NaiveDate),
    /// Inclusive start/end, only valid together with [`Period::Range`]
    Range(NaiveDate, NaiveDate),
}

impl ReportDate {
    pub fn is_range(&self) -> bool {
        matches!(self, ReportDate::Range(..))
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportDate::Today => f.write_str("today"),
            ReportDate::Yesterday => f.write_str("yesterday"),
            ReportDate::Day(day) => write!(f, "{}", day.format(DATE_FORMAT)),
            ReportDate::Range(start, end) => write!(f, "{},{}", start.format(DATE_FORMAT), end.format(DATE_FORMAT)),
        }
    }
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| Error::bad_request(format!("Invalid date '{s}'. Expected YYYY-MM-DD, today or yesterday")))
}

impl FromStr for ReportDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "today" => return Ok(ReportDate::Today),
            "yesterday" => return Ok(ReportDate::Yesterday),
            _ => {}
        }

        if let Some((start, end)) = trimmed.split_once(',') {
            let (start, end) = (parse_day(start)?, parse_day(end)?);
            if start > end {
                return Err(Error::bad_request(format!("Invalid date range '{s}': start is after end")));
            }
            return Ok(ReportDate::Range(start, end));
        }

        parse_day(trimmed).map(ReportDate::Day)
    }
}

impl Serialize for ReportDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|e: Error| serde::de::Error::custom(e.to_string()))
    }
}

/// The (site, period, date) triple a metric set is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryScope {
    pub site_id: u32,
    pub period: Period,
    pub date: ReportDate,
}

impl QueryScope {
    pub fn new(site_id: u32, period: Period, date: ReportDate) -> Result<Self> {
        if site_id == 0 {
            return Err(Error::bad_request("Site id must be a positive integer"));
        }
        match (period, date.is_range()) {
            (Period::Range, false) => Err(Error::bad_request(format!(
                "Period 'range' requires a date of the form YYYY-MM-DD,YYYY-MM-DD, got '{date}'"
            ))),
            (_, true) if period != Period::Range => Err(Error::bad_request(format!(
                "Date range '{date}' is only valid with period 'range', got '{period}'"
            ))),
            _ => Ok(Self { site_id, period, date }),
        }
    }
}

/// Result of a remote lookup.
///
/// Remote failures never abort a summary. `Missing` is a legitimate absence (HTTP 404, empty
/// `data` array), `Failed` carries the reason the call could not be completed.
#[derive(Debug)]
pub enum Outcome<T> {
    Found(T),
    Missing,
    Failed(anyhow::Error),
}

impl<T> Outcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            Outcome::Missing | Outcome::Failed(_) => None,
        }
    }

    /// Collapse into an `Option`, logging failures at warn level.
    pub fn or_warn(self, what: &str) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            Outcome::Missing => {
                tracing::debug!("{} returned no data", what);
                None
            }
            Outcome::Failed(e) => {
                tracing::warn!(error = %format!("{e:#}"), "{} failed, continuing with partial results", what);
                None
            }
        }
    }
}

impl<T> From<anyhow::Result<Option<T>>> for Outcome<T> {
    fn from(value: anyhow::Result<Option<T>>) -> Self {
        match value {
            Ok(Some(v)) => Outcome::Found(v),
            Ok(None) => Outcome::Missing,
            Err(e) => Outcome::Failed(e),
        }
    }
}
