//! Summary aggregation.
//!
//! The aggregator composes segment building, analytics queries and directory lookups into
//! [`SummaryTable`]s. Remote failures never abort a summary: a failed analytics query yields zeros,
//! a failed metadata lookup drops the label and the country row, and both are logged at `warn`.
//!
//! Row order is fixed regardless of how the underlying calls interleave: entities in directory
//! listing order, and for each entity the global row followed by the in-country row.

use bon::Builder;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::analytics::{AnalyticsQuery, MetricSet, NB_DOWNLOADS, NB_VISITS};
use crate::directory::{DirectoryClient, EntityRecord, LISTING_FIELDS};
use crate::segment::{DownloadType, Segment};
use crate::table::{SummaryRow, SummaryTable};
use crate::types::{EntityId, EntityKind, Outcome, QueryScope};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Categories included in the site overview, in output order.
pub const OVERVIEW_KINDS: [EntityKind; 2] = [EntityKind::Operation, EntityKind::Space];

/// Builds summary tables from an injected directory and analytics backend.
///
/// # Example
///
/// ```ignore
/// let aggregator = Aggregator::builder()
///     .directory(Arc::new(DirectoryReqwest::new(&config.directory)?))
///     .analytics(Arc::new(MatomoReqwest::new(&config.analytics)?))
///     .concurrency(config.summary.concurrency)
///     .build();
/// let table = aggregator.summarize_entity(&scope, EntityKind::Operation, &EntityId::new("42")).await;
/// ```
#[derive(Clone, Builder)]
pub struct Aggregator {
    directory: Arc<dyn DirectoryClient>,
    analytics: Arc<dyn AnalyticsQuery>,
    /// Entities summarized at once by `summarize_all`
    #[builder(default = DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

impl Aggregator {
    /// Global row for one entity, followed by its in-country row when the directory knows the
    /// entity's country.
    ///
    /// A missing or failed metadata lookup still produces the global row, without a label.
    #[instrument(skip_all, fields(site_id = scope.site_id, period = %scope.period, date = %scope.date, kind = %kind, id = %id))]
    pub async fn summarize_entity(&self, scope: &QueryScope, kind: EntityKind, id: &EntityId) -> SummaryTable {
        let base = Segment::base(kind, id);
        let (metadata, global) = futures::join!(self.directory.fetch_entity(kind, id), self.metrics_for(scope, &base));
        let metadata = metadata.or_warn(&format!("Directory lookup of {kind} {id}"));

        self.assemble(scope, kind, id, &base, metadata.as_ref(), None, global).await
    }

    /// Every entity of `kind` the directory lists, in listing order.
    ///
    /// Entities whose metadata cannot be fetched are left out entirely.
    #[instrument(skip_all, fields(site_id = scope.site_id, period = %scope.period, date = %scope.date, kind = %kind))]
    pub async fn summarize_all(&self, scope: &QueryScope, kind: EntityKind) -> SummaryTable {
        let entities = self.listed(kind).await;
        info!("Summarizing {} {}", entities.len(), kind.plural());

        let tables: Vec<SummaryTable> = stream::iter(entities)
            .map(|(id, listed_label)| async move { self.summarize_listed(scope, kind, &id, listed_label).await })
            .buffered(self.concurrency.max(1))
            .collect()
            .await;

        let mut table = SummaryTable::new();
        for entity_table in tables {
            table.extend(entity_table);
        }
        table
    }

    /// One global row per listed operation, then per listed space.
    ///
    /// Rows are labelled from the listing and never narrowed by country. An entity whose listing
    /// carries no label is looked up for one, and keeps its row when that lookup fails.
    #[instrument(skip_all, fields(site_id = scope.site_id, period = %scope.period, date = %scope.date))]
    pub async fn summarize_overview(&self, scope: &QueryScope) -> SummaryTable {
        let mut table = SummaryTable::new();
        for kind in OVERVIEW_KINDS {
            let entities = self.listed(kind).await;
            debug!("Overview of {} {}", entities.len(), kind.plural());

            let rows: Vec<SummaryRow> = stream::iter(entities)
                .map(|(id, listed_label)| async move { self.overview_row(scope, kind, id, listed_label).await })
                .buffered(self.concurrency.max(1))
                .collect()
                .await;
            for row in rows {
                table.push(row);
            }
        }
        table
    }

    /// Ids and labels the directory lists for `kind`. A failed listing yields nothing.
    async fn listed(&self, kind: EntityKind) -> Vec<(EntityId, Option<String>)> {
        let Some(listing) = self
            .directory
            .fetch_entity_list(kind, &LISTING_FIELDS)
            .await
            .or_warn(&format!("Directory listing of {}", kind.plural()))
        else {
            return Vec::new();
        };

        listing
            .into_iter()
            .filter_map(|record| match record.id {
                Some(id) => Some((id, record.label)),
                None => {
                    debug!("Skipping {} listed without an id", kind);
                    None
                }
            })
            .collect()
    }

    async fn overview_row(&self, scope: &QueryScope, kind: EntityKind, id: EntityId, listed_label: Option<String>) -> SummaryRow {
        let base = Segment::base(kind, &id);
        let label = async {
            match listed_label.filter(|label| !label.trim().is_empty()) {
                Some(label) => Some(label),
                None => self
                    .directory
                    .fetch_entity(kind, &id)
                    .await
                    .or_warn(&format!("Directory lookup of {kind} {id}"))
                    .and_then(|record| record.label),
            }
        };
        let (label, metrics) = futures::join!(label, self.metrics_for(scope, &base));
        SummaryRow::global(kind, id, label, metrics)
    }

    async fn summarize_listed(&self, scope: &QueryScope, kind: EntityKind, id: &EntityId, listed_label: Option<String>) -> SummaryTable {
        let metadata = match self.directory.fetch_entity(kind, id).await {
            Outcome::Found(record) => record,
            Outcome::Missing => {
                warn!("Skipping {} {}: not found in the directory", kind, id);
                return SummaryTable::new();
            }
            Outcome::Failed(e) => {
                warn!(error = %format!("{e:#}"), "Skipping {} {}: directory lookup failed", kind, id);
                return SummaryTable::new();
            }
        };

        let base = Segment::base(kind, id);
        let global = self.metrics_for(scope, &base).await;
        self.assemble(scope, kind, id, &base, Some(&metadata), listed_label, global).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        scope: &QueryScope,
        kind: EntityKind,
        id: &EntityId,
        base: &Segment,
        metadata: Option<&EntityRecord>,
        fallback_label: Option<String>,
        global: MetricSet,
    ) -> SummaryTable {
        let label = metadata.and_then(|record| record.label.clone()).or(fallback_label);
        let country_code = metadata.and_then(EntityRecord::country_code);

        let mut table = SummaryTable::new();
        table.push(SummaryRow::global(kind, id.clone(), label.clone(), global));

        if let Some(country_code) = country_code {
            let metrics = self.metrics_for(scope, &base.with_country(country_code)).await;
            table.push(SummaryRow::in_country(kind, id.clone(), label.as_deref(), country_code, metrics));
        } else {
            debug!("No country for {} {}, skipping in-country row", kind, id);
        }

        table
    }

    /// Visits, downloads and per-type downloads for one segment.
    async fn metrics_for(&self, scope: &QueryScope, segment: &Segment) -> MetricSet {
        let base_query = self.analytics.query(scope, segment, &[NB_VISITS, NB_DOWNLOADS]);
        let subtype_queries = join_all(DownloadType::ALL.into_iter().map(|download_type| {
            let segment = segment.with_download_type(download_type);
            async move { (download_type, self.analytics.query(scope, &segment, &[NB_DOWNLOADS]).await) }
        }));
        let (base, subtypes) = futures::join!(base_query, subtype_queries);

        let mut metrics = base
            .or_warn(&format!("Analytics query for '{segment}'"))
            .map(|set| set.project(&[NB_VISITS, NB_DOWNLOADS]))
            .unwrap_or_else(|| MetricSet::zeroed(&[NB_VISITS, NB_DOWNLOADS]));

        for (download_type, outcome) in subtypes {
            let downloads = outcome
                .or_warn(&format!("Analytics query for {download_type} downloads on '{segment}'"))
                .map(|set| set.get(NB_DOWNLOADS))
                .unwrap_or(0);
            metrics.insert(download_type.metric_name(), downloads);
        }

        metrics
    }
}
