//! Service traits for record storage and durable sequences

use crate::core::Entity;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Service trait for storing one entity type
///
/// Implementations provide CRUD operations for a specific entity type.
/// The ledger is agnostic to the underlying storage mechanism.
#[async_trait]
pub trait DataService<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: T) -> Result<T>;

    /// Get an entity by ID
    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// List all entities, newest first
    async fn list(&self) -> Result<Vec<T>>;

    /// Replace an existing entity
    ///
    /// Fails if no entity with this ID exists.
    async fn update(&self, id: &Uuid, entity: T) -> Result<T>;

    /// Replace an entity only if its stored version still equals `expected_version`
    ///
    /// Returns `Ok(None)` when the stored version moved on (or the entity is
    /// gone), leaving the stored record untouched. The caller owns bumping the
    /// version carried by `entity`.
    async fn update_if_version(
        &self,
        id: &Uuid,
        expected_version: u64,
        entity: T,
    ) -> Result<Option<T>>;

    /// Delete an entity
    ///
    /// Returns whether a record was removed; deleting a missing ID is not an error.
    async fn delete(&self, id: &Uuid) -> Result<bool>;

    /// Find entities whose serialized top-level `field` equals `value`
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>>;
}

/// Durable, atomically incremented named counters
///
/// Every call advances the counter exactly once, even under concurrent
/// callers in different processes (for persistent backends).
#[async_trait]
pub trait SequenceService: Send + Sync {
    /// Increment the counter called `name` and return its new value
    ///
    /// A counter that has never been used starts at zero, so its first value is 1.
    async fn next_value(&self, name: &str) -> Result<u64>;
}
