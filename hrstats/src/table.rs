//! Presentation table handed back to whatever renders the summary.

use serde::Serialize;
use serde_json::Value;

use crate::analytics::{MetricSet, NB_DOWNLOADS, NB_VISITS};
use crate::segment::DownloadType;
use crate::types::{EntityId, EntityKind};

/// Appended to the label of a row narrowed to the entity's own country.
pub const IN_COUNTRY_SUFFIX: &str = " - in country";

pub const LABEL_COLUMN: &str = "label";

/// One entity's metrics over one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "entity_type")]
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub label: Option<String>,
    pub in_country: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(flatten)]
    pub metrics: MetricSet,
}

impl SummaryRow {
    /// Row over the unfiltered base segment.
    pub fn global(kind: EntityKind, id: EntityId, label: Option<String>, metrics: MetricSet) -> Self {
        Self {
            entity_kind: kind,
            entity_id: id,
            label,
            in_country: false,
            country_code: None,
            metrics,
        }
    }

    /// Row over the base segment narrowed to `country_code`.
    pub fn in_country(kind: EntityKind, id: EntityId, label: Option<&str>, country_code: &str, metrics: MetricSet) -> Self {
        let mut label = label.unwrap_or_default().to_string();
        label.push_str(IN_COUNTRY_SUFFIX);
        Self {
            entity_kind: kind,
            entity_id: id,
            label: Some(label),
            in_country: true,
            country_code: Some(country_code.to_string()),
            metrics,
        }
    }

    /// Value of `column`, `None` for columns this row does not carry.
    pub fn get(&self, column: &str) -> Option<Value> {
        if column == LABEL_COLUMN {
            return Some(self.label.clone().map(Value::String).unwrap_or(Value::Null));
        }
        self.metrics.contains(column).then(|| Value::from(self.metrics.get(column)))
    }
}

/// Ordered summary rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column names in display order.
    pub fn columns() -> Vec<String> {
        let mut columns = vec![LABEL_COLUMN.to_string(), NB_VISITS.to_string(), NB_DOWNLOADS.to_string()];
        columns.extend(DownloadType::ALL.iter().map(DownloadType::metric_name));
        columns
    }

    pub fn push(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    pub fn extend(&mut self, other: SummaryTable) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SummaryRow> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    /// Cell at (`row`, `column`).
    pub fn get(&self, row: usize, column: &str) -> Option<Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

impl FromIterator<SummaryRow> for SummaryTable {
    fn from_iter<I: IntoIterator<Item = SummaryRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SummaryTable {
    type Item = SummaryRow;
    type IntoIter = std::vec::IntoIter<SummaryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a SummaryTable {
    type Item = &'a SummaryRow;
    type IntoIter = std::slice::Iter<'a, SummaryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
