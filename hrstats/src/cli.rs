//! Subcommands of the `hrstats` binary.

use clap::Subcommand;

use crate::errors::Result;
use crate::summary::Aggregator;
use crate::table::SummaryTable;
use crate::types::{EntityId, EntityKind, Period, QueryScope, ReportDate};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a summary table as JSON and exit
    Summary(SummaryArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Analytics site id
    #[arg(long)]
    pub site: u32,

    /// Reporting period: day, week, month, year or range
    #[arg(long, default_value = "day")]
    pub period: Period,

    /// YYYY-MM-DD, today, yesterday, or YYYY-MM-DD,YYYY-MM-DD with --period range
    #[arg(long, default_value = "yesterday")]
    pub date: ReportDate,

    /// Entity type. Without it, operations and spaces are summarized.
    #[arg(long)]
    pub kind: Option<EntityKind>,

    /// Entity id. Without it, every listed entity of --kind is summarized.
    #[arg(long, requires = "kind")]
    pub id: Option<String>,
}

impl SummaryArgs {
    pub async fn run(&self, aggregator: &Aggregator) -> Result<SummaryTable> {
        let scope = QueryScope::new(self.site, self.period, self.date)?;

        Ok(match (self.kind, self.id.as_deref()) {
            (Some(kind), Some(id)) => aggregator.summarize_entity(&scope, kind, &EntityId::parse(id)?).await,
            (Some(kind), None) => aggregator.summarize_all(&scope, kind).await,
            (None, _) => aggregator.summarize_overview(&scope).await,
        })
    }
}
