//! Summary request and response models.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::table::SummaryTable;
use crate::types::{Period, QueryScope, ReportDate};

/// Query parameters shared by every summary route.
///
/// Kept as raw strings so parse failures come back through [`Error::BadRequest`] with a message
/// naming the accepted values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    /// day, week, month, year or range
    pub period: Option<String>,
    /// YYYY-MM-DD, today, yesterday or YYYY-MM-DD,YYYY-MM-DD
    pub date: Option<String>,
}

impl SummaryQuery {
    pub fn scope(&self, site_id: &str) -> Result<QueryScope> {
        let site_id = site_id
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::bad_request(format!("Invalid site id '{site_id}'. Expected a positive integer")))?;
        let period = match self.period.as_deref() {
            Some(raw) => raw.parse::<Period>()?,
            None => Period::default(),
        };
        let date = match self.date.as_deref() {
            Some(raw) => raw.parse::<ReportDate>()?,
            None => ReportDate::default(),
        };
        QueryScope::new(site_id, period, date)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub scope: QueryScope,
    /// Display columns, in order
    pub columns: Vec<String>,
    pub rows: SummaryTable,
}

impl SummaryResponse {
    pub fn new(scope: QueryScope, rows: SummaryTable) -> Self {
        Self {
            scope,
            columns: SummaryTable::columns(),
            rows,
        }
    }
}
