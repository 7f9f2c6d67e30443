//! Shared test harness for storage backend testing
//!
//! Provides `TestRecord`, a versioned entity with string, integer and boolean
//! fields for search testing, plus the `data_service_tests!` and
//! `sequence_service_tests!` conformance suites.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! data_service_tests!(InMemoryDataService::<TestRecord>::new());
//! sequence_service_tests!(InMemorySequenceService::new());
//! ```

#![allow(dead_code)]

#[macro_use]
mod data_service_tests;
#[macro_use]
mod sequence_service_tests;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TestRecord — versioned entity covering string, integer and boolean search
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub active: bool,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

lms_invoicing::impl_entity!(TestRecord, "test_record", "test_records", versioned);

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Create a `TestRecord` with a random ID, version 0 and `now` timestamps.
pub fn create_test_record(name: &str, email: &str, age: i64, active: bool) -> TestRecord {
    let now = Utc::now();
    TestRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        age,
        active,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Create a `TestRecord` whose creation time lies `hours_ago` hours in the past.
pub fn create_aged_record(name: &str, hours_ago: i64) -> TestRecord {
    let mut record = create_test_record(name, &format!("{}@test.com", name), 20, true);
    record.created_at = record.created_at - Duration::hours(hours_ago);
    record.updated_at = record.created_at;
    record
}

/// Copy of `record` carrying the next version, as a writer would store it.
pub fn next_version(record: &TestRecord, name: &str) -> TestRecord {
    let mut next = record.clone();
    next.name = name.to_string();
    next.version += 1;
    next.updated_at = Utc::now();
    next
}
