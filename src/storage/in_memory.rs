//! In-memory implementations of DataService and SequenceService for testing and development

use crate::core::{DataService, Entity, SequenceService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// In-memory record store
///
/// Useful for testing and development. Uses RwLock for thread-safe access;
/// clones share the same underlying map.
#[derive(Clone)]
pub struct InMemoryDataService<T> {
    records: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> InMemoryDataService<T> {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare a serialized field against a search string
///
/// Strings compare verbatim; numbers and booleans compare by their JSON text.
fn field_matches(record: &serde_json::Value, field: &str, value: &str) -> bool {
    match record.get(field) {
        Some(serde_json::Value::String(s)) => s == value,
        Some(serde_json::Value::Null) | None => false,
        Some(other) => other.to_string() == value,
    }
}

#[async_trait]
impl<T: Entity> DataService<T> for InMemoryDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.insert(entity.id(), entity.clone());

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut all: Vec<T> = records.values().cloned().collect();
        all.sort_by_key(|r| std::cmp::Reverse(r.created_at()));

        Ok(all)
    }

    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let slot = records
            .get_mut(id)
            .ok_or_else(|| anyhow!("Entity not found: {}", id))?;
        *slot = entity.clone();

        Ok(entity)
    }

    async fn update_if_version(
        &self,
        id: &Uuid,
        expected_version: u64,
        entity: T,
    ) -> Result<Option<T>> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        match records.get_mut(id) {
            Some(slot) if slot.version() == expected_version => {
                *slot = entity.clone();
                Ok(Some(entity))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(records.remove(id).is_some())
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut found = Vec::new();
        for record in records.values() {
            let json = serde_json::to_value(record)
                .map_err(|e| anyhow!("Failed to serialize entity: {}", e))?;
            if field_matches(&json, field, value) {
                found.push(record.clone());
            }
        }

        Ok(found)
    }
}

/// In-memory named counters
///
/// Atomic within one process only; restarts reset every counter.
#[derive(Clone, Default)]
pub struct InMemorySequenceService {
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl InMemorySequenceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a counter at `value`, so the next call returns `value + 1`
    pub fn seed(&self, name: &str, value: u64) -> Result<()> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| anyhow!("Failed to acquire counter lock: {}", e))?;
        counters.insert(name.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl SequenceService for InMemorySequenceService {
    async fn next_value(&self, name: &str) -> Result<u64> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| anyhow!("Failed to acquire counter lock: {}", e))?;

        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;

        Ok(*value)
    }
}
