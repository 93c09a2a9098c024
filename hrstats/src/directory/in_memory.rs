//! In-memory directory for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::DirectoryClient;
use super::models::EntityRecord;
use crate::types::{EntityId, EntityKind, Outcome};

/// Record of a call made to the static directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Entity(EntityKind, EntityId),
    List(EntityKind),
}

/// A static implementation of `DirectoryClient` that serves predefined records.
///
/// # Example
/// ```ignore
/// let directory = StaticDirectory::new()
///     .with_entity(EntityKind::Operation, EntityRecord::new("42", "Nepal Earthquake").with_country("NP"))
///     .with_listing(EntityKind::Operation, vec![EntityRecord::new("42", "Nepal Earthquake")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entities: HashMap<(EntityKind, EntityId), EntityRecord>,
    failing: HashSet<(EntityKind, EntityId)>,
    listings: HashMap<EntityKind, Vec<EntityRecord>>,
    failing_listings: HashSet<EntityKind>,
    calls: Arc<Mutex<Vec<DirectoryCall>>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `record` for its own id. Records without an id are ignored.
    pub fn with_entity(mut self, kind: EntityKind, record: EntityRecord) -> Self {
        if let Some(id) = record.id.clone() {
            self.entities.insert((kind, id), record);
        }
        self
    }

    /// Make lookups of this entity fail as if the directory were unreachable.
    pub fn with_failure(mut self, kind: EntityKind, id: impl Into<EntityId>) -> Self {
        self.failing.insert((kind, id.into()));
        self
    }

    pub fn with_listing(mut self, kind: EntityKind, records: Vec<EntityRecord>) -> Self {
        self.listings.insert(kind, records);
        self
    }

    pub fn with_listing_failure(mut self, kind: EntityKind) -> Self {
        self.failing_listings.insert(kind);
        self
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Outcome<EntityRecord> {
        self.calls.lock().push(DirectoryCall::Entity(kind, id.clone()));

        let key = (kind, id.clone());
        if self.failing.contains(&key) {
            return Outcome::Failed(anyhow::anyhow!("static directory: {} {} unreachable", kind, id));
        }
        match self.entities.get(&key) {
            Some(record) => Outcome::Found(record.clone()),
            None => Outcome::Missing,
        }
    }

    async fn fetch_entity_list(&self, kind: EntityKind, _fields: &[&str]) -> Outcome<Vec<EntityRecord>> {
        self.calls.lock().push(DirectoryCall::List(kind));

        if self.failing_listings.contains(&kind) {
            return Outcome::Failed(anyhow::anyhow!("static directory: {} listing unreachable", kind.plural()));
        }
        match self.listings.get(&kind) {
            Some(records) => Outcome::Found(records.clone()),
            None => Outcome::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lookups() {
        let directory = StaticDirectory::new()
            .with_entity(EntityKind::Operation, EntityRecord::new("42", "Nepal Earthquake").with_country("NP"))
            .with_failure(EntityKind::Operation, "13");

        let found = directory.fetch_entity(EntityKind::Operation, &EntityId::new("42")).await;
        assert_eq!(found.found().unwrap().country_code(), Some("NP"));

        // Same id under another kind is a different entity
        let missing = directory.fetch_entity(EntityKind::Space, &EntityId::new("42")).await;
        assert!(matches!(missing, Outcome::Missing));

        let failed = directory.fetch_entity(EntityKind::Operation, &EntityId::new("13")).await;
        assert!(matches!(failed, Outcome::Failed(_)));

        assert_eq!(
            directory.calls(),
            vec![
                DirectoryCall::Entity(EntityKind::Operation, EntityId::new("42")),
                DirectoryCall::Entity(EntityKind::Space, EntityId::new("42")),
                DirectoryCall::Entity(EntityKind::Operation, EntityId::new("13")),
            ]
        );
    }

    #[tokio::test]
    async fn test_static_directory_listings() {
        let directory = StaticDirectory::new()
            .with_listing(EntityKind::Space, vec![EntityRecord::new("1", "A"), EntityRecord::new("2", "B")])
            .with_listing_failure(EntityKind::Bundle);

        let listed = directory.fetch_entity_list(EntityKind::Space, &["id", "label"]).await.found().unwrap();
        assert_eq!(listed.len(), 2);

        assert!(matches!(directory.fetch_entity_list(EntityKind::Bundle, &[]).await, Outcome::Failed(_)));
        assert!(matches!(directory.fetch_entity_list(EntityKind::Cluster, &[]).await, Outcome::Missing));
    }
}
