//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides `MongoDataService<T>` and `MongoSequenceService` backed by a
//! `mongodb::Database`.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag:
//! ```toml
//! [dependencies]
//! lms-invoicing = { version = "0.1", features = ["mongodb_backend"] }
//! ```
//!
//! # Storage model
//!
//! Each `MongoDataService<T>` operates on a collection named after
//! `T::resource_name()` ("invoices", "courses", "students"). Named counters
//! live in a single `counters` collection, one document per counter.
//!
//! # Serialization strategy
//!
//! Entities are serialized via `serde_json::Value` as an intermediate format,
//! then converted to BSON documents. UUIDs and timestamps are stored as
//! strings, money as doubles. The `id` field is mapped to MongoDB's `_id`
//! convention.

use crate::core::{DataService, Entity, SequenceService, StorageError};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Database, IndexModel};
use uuid::Uuid;

/// Collection holding named counters
pub const COUNTERS_COLLECTION: &str = "counters";

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> Result<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id` for domain entity convention.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

/// Convert a UUID to its BSON string representation for queries.
fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

/// Filter matching a record at a given version
///
/// Records written before versioning have no `version` field; they count as 0.
fn version_filter(id: &Uuid, expected_version: u64) -> Result<Document> {
    let expected = i64::try_from(expected_version)
        .map_err(|_| anyhow!("Version {} does not fit in BSON int64", expected_version))?;

    Ok(if expected == 0 {
        doc! {
            "_id": uuid_bson(id),
            "$or": [
                { "version": 0_i64 },
                { "version": { "$exists": false } },
            ],
        }
    } else {
        doc! { "_id": uuid_bson(id), "version": expected }
    })
}

// ---------------------------------------------------------------------------
// MongoDataService<T>
// ---------------------------------------------------------------------------

/// Generic record store backed by MongoDB.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
/// use lms_invoicing::storage::MongoDataService;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let db = client.database("lms");
/// let invoices = MongoDataService::<Invoice>::new(db);
/// invoices.ensure_unique_index("invoiceNumber").await?;
/// ```
#[derive(Clone, Debug)]
pub struct MongoDataService<T> {
    database: Database,
    _marker: std::marker::PhantomData<T>,
}

impl<T> MongoDataService<T> {
    /// Create a new `MongoDataService` with the given database handle.
    pub fn new(database: Database) -> Self {
        Self {
            database,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl<T: Entity> MongoDataService<T> {
    /// Get the MongoDB collection for this entity type.
    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(T::resource_name())
    }

    /// Convert a domain entity into a MongoDB document.
    fn entity_to_document(entity: &T) -> Result<Document> {
        let json = serde_json::to_value(entity)
            .map_err(|e| anyhow!("Failed to serialize entity: {}", e))?;
        json_to_document(json)
    }

    /// Convert a MongoDB document back into a domain entity.
    fn document_to_entity(doc: Document) -> Result<T> {
        let json = document_to_json(doc);
        serde_json::from_value(json)
            .map_err(|e| anyhow!("Failed to deserialize entity from document: {}", e))
    }

    /// Create a unique index on a serialized field (e.g. `invoiceNumber`).
    ///
    /// Idempotent; safe to call on every startup.
    pub async fn ensure_unique_index(&self, field: &str) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection()
            .create_index(index)
            .await
            .map_err(|e| anyhow!("Failed to create unique index on {}: {}", field, e))?;

        Ok(())
    }
}

const DUPLICATE_KEY_CODE: i32 = 11000;

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl<T: Entity> DataService<T> for MongoDataService<T> {
    /// Insert a new entity into the collection.
    async fn create(&self, entity: T) -> Result<T> {
        let doc = Self::entity_to_document(&entity)?;

        self.collection()
            .insert_one(doc)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    anyhow::Error::new(StorageError::DuplicateKey {
                        message: e.to_string(),
                    })
                } else {
                    anyhow!("Failed to create entity: {}", e)
                }
            })?;

        Ok(entity)
    }

    /// Fetch an entity by UUID.
    ///
    /// Returns `Ok(None)` if the entity does not exist.
    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let doc = self
            .collection()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to get entity: {}", e))?;

        doc.map(Self::document_to_entity).transpose()
    }

    /// List all entities, ordered by creation time (newest first).
    async fn list(&self) -> Result<Vec<T>> {
        let cursor = self
            .collection()
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(|e| anyhow!("Failed to list entities: {}", e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect entities: {}", e))?;

        docs.into_iter().map(Self::document_to_entity).collect()
    }

    /// Update an existing entity.
    ///
    /// Returns `Err` if the entity does not exist (no document matched).
    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let doc = Self::entity_to_document(&entity)?;

        let result = self
            .collection()
            .replace_one(doc! { "_id": uuid_bson(id) }, doc)
            .await
            .map_err(|e| anyhow!("Failed to update entity: {}", e))?;

        if result.matched_count == 0 {
            return Err(anyhow!("Entity not found: {}", id));
        }

        Ok(entity)
    }

    /// Replace the document only while its stored version still matches.
    ///
    /// The filter and the replacement are applied by the server as one
    /// atomic single-document operation.
    async fn update_if_version(
        &self,
        id: &Uuid,
        expected_version: u64,
        entity: T,
    ) -> Result<Option<T>> {
        let doc = Self::entity_to_document(&entity)?;

        let result = self
            .collection()
            .replace_one(version_filter(id, expected_version)?, doc)
            .await
            .map_err(|e| anyhow!("Failed to update entity: {}", e))?;

        if result.matched_count == 0 {
            return Ok(None);
        }

        Ok(Some(entity))
    }

    /// Delete an entity by UUID.
    ///
    /// Silently succeeds if the entity does not exist (idempotent).
    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = self
            .collection()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| anyhow!("Failed to delete entity: {}", e))?;

        Ok(result.deleted_count > 0)
    }

    /// Search entities by field value.
    ///
    /// The value arrives as a string but MongoDB keeps native BSON types, so
    /// numeric and boolean spellings are matched with `$in` as well.
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let mut variants: Vec<Bson> = vec![Bson::String(value.to_string())];

        match value {
            "true" => variants.push(Bson::Boolean(true)),
            "false" => variants.push(Bson::Boolean(false)),
            _ => {
                if let Ok(i) = value.parse::<i64>() {
                    variants.push(Bson::Int64(i));
                    variants.push(Bson::Double(i as f64));
                } else if let Ok(f) = value.parse::<f64>() {
                    variants.push(Bson::Double(f));
                }
            }
        }

        let cursor = self
            .collection()
            .find(doc! { field: { "$in": variants } })
            .await
            .map_err(|e| anyhow!("Failed to search entities: {}", e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| anyhow!("Failed to collect search results: {}", e))?;

        docs.into_iter().map(Self::document_to_entity).collect()
    }
}

// ---------------------------------------------------------------------------
// MongoSequenceService
// ---------------------------------------------------------------------------

/// Durable named counters backed by MongoDB.
///
/// Each counter is a `{ _id: name, value: n }` document in the `counters`
/// collection, advanced with an upserting `$inc`, so concurrent callers in
/// any number of processes each observe a distinct value.
#[derive(Clone, Debug)]
pub struct MongoSequenceService {
    database: Database,
}

impl MongoSequenceService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(COUNTERS_COLLECTION)
    }
}

#[async_trait]
impl SequenceService for MongoSequenceService {
    async fn next_value(&self, name: &str) -> Result<u64> {
        let counter = self
            .collection()
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "value": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| anyhow!("Failed to advance counter {}: {}", name, e))?
            .ok_or_else(|| anyhow!("Counter {} missing after upsert", name))?;

        let value = counter
            .get_i64("value")
            .map_err(|e| anyhow!("Counter {} has no integer value: {}", name, e))?;

        u64::try_from(value).map_err(|_| anyhow!("Counter {} is negative: {}", name, value))
    }
}
