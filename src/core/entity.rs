//! Entity trait defining the core abstraction for every stored record

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Base trait for all records kept in a [`DataService`](crate::core::DataService).
///
/// All entities have:
/// - id: Unique identifier
/// - created_at: Creation timestamp
/// - updated_at: Last modification timestamp
/// - version: Optimistic concurrency counter (0 for records that are never
///   written concurrently)
///
/// Storage backends serialize entities through serde, so the trait requires
/// both directions.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The plural resource name, used as the collection name (e.g., "invoices")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "invoice")
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier for this entity instance
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;

    /// Get the optimistic concurrency version.
    ///
    /// Records that are only ever replaced wholesale can keep the default.
    fn version(&self) -> u64 {
        0
    }
}
