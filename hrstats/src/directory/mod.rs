//! Client for the humanitarian response directory.
//!
//! The directory is an unauthenticated JSON API listing operations, spaces, bundles and clusters.
//! Lookups never fail the caller: every call yields an [`Outcome`] and the aggregator decides how
//! to degrade. See [`DirectoryReqwest`] for the HTTP implementation and [`StaticDirectory`] for an
//! in-memory one.

mod fetch;
mod in_memory;
pub mod models;

pub use fetch::DirectoryReqwest;
pub use in_memory::{DirectoryCall, StaticDirectory};
pub use models::{CountryRef, DirectoryEnvelope, EntityRecord, OperationRef};

use async_trait::async_trait;

use crate::types::{EntityId, EntityKind, Outcome};

/// Fields requested when listing a category.
pub const LISTING_FIELDS: [&str; 2] = ["id", "label"];

/// A trait for looking up directory entities.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// `GET {base}/{plural}/{id}`, first element of `data`.
    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Outcome<EntityRecord>;

    /// `GET {base}/{plural}/?fields=...`, all of `data` in directory order.
    async fn fetch_entity_list(&self, kind: EntityKind, fields: &[&str]) -> Outcome<Vec<EntityRecord>>;
}
