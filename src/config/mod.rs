//! Configuration loading and management
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields a working in-memory server on `127.0.0.1:3000`.

use crate::core::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub invoicing: InvoicingConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub seed: SeedConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accept cross-origin requests from any origin
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            permissive_cors: false,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ledger rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicingConfig {
    /// Fixed tag in front of every invoice number
    pub number_prefix: String,

    /// Reserved base added to the counter value (base 1000 gives INV1001 first)
    pub number_base: u64,

    /// Name of the durable counter backing invoice numbers
    pub sequence_name: String,

    /// Accept payments (and fee reductions) that leave the balance negative
    pub allow_overpayment: bool,

    /// Only accept Cash, UPI, Card, Bank Transfer and Cheque
    pub strict_payment_modes: bool,

    /// Reject invoices whose student reference does not resolve
    pub verify_student_exists: bool,

    /// Compare-and-swap attempts before a write reports a conflict
    pub max_write_attempts: u32,

    /// Offset, in minutes east of UTC, used to decide which month a payment belongs to
    pub reporting_utc_offset_minutes: i32,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            number_prefix: "INV".to_string(),
            number_base: 1000,
            sequence_name: "invoice_number".to_string(),
            allow_overpayment: false,
            strict_payment_modes: false,
            verify_student_exists: false,
            max_write_attempts: 5,
            reporting_utc_offset_minutes: 0,
        }
    }
}

/// Which record store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Mongodb,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "lms".to_string(),
        }
    }
}

/// Receipt delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// When false, receipts are rendered and logged but never handed to a notifier
    pub enabled: bool,

    /// Send a receipt automatically after every recorded payment
    pub send_on_payment: bool,

    /// Name shown in the receipt header
    pub organization_name: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            send_on_payment: false,
            organization_name: "Learning Center".to_string(),
        }
    }
}

/// Courses and students written to the stores when the host starts
///
/// Entries with an `id` are skipped when a record with that id already
/// exists, so a persistent backend can be seeded on every start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub courses: Vec<SeedCourse>,
    pub students: Vec<SeedStudent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCourse {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedStudent {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub candidate_name: String,
    pub email: String,
    pub mobile_no: String,
    #[serde(default)]
    pub name_of_programme: Option<String>,
}

const MAX_OFFSET_MINUTES: u32 = 14 * 60;

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("{}: {}", path.display(), e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invoicing = &self.invoicing;
        if invoicing.number_prefix.trim().is_empty() {
            return Err(invalid(
                "invoicing.number_prefix",
                &invoicing.number_prefix,
                "must not be empty",
            ));
        }
        if invoicing.sequence_name.trim().is_empty() {
            return Err(invalid(
                "invoicing.sequence_name",
                &invoicing.sequence_name,
                "must not be empty",
            ));
        }
        if invoicing.max_write_attempts == 0 {
            return Err(invalid(
                "invoicing.max_write_attempts",
                "0",
                "at least one attempt is required",
            ));
        }
        if invoicing.reporting_utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(invalid(
                "invoicing.reporting_utc_offset_minutes",
                &invoicing.reporting_utc_offset_minutes.to_string(),
                "must be within +/-14 hours",
            ));
        }
        for (i, course) in self.seed.courses.iter().enumerate() {
            if course.title.trim().is_empty() {
                return Err(invalid(
                    &format!("seed.courses[{}].title", i),
                    &course.title,
                    "must not be empty",
                ));
            }
            if course.price.is_sign_negative() && !course.price.is_zero() {
                return Err(invalid(
                    &format!("seed.courses[{}].price", i),
                    &course.price.to_string(),
                    "must not be negative",
                ));
            }
        }
        for (i, student) in self.seed.students.iter().enumerate() {
            if student.candidate_name.trim().is_empty() {
                return Err(invalid(
                    &format!("seed.students[{}].candidate_name", i),
                    &student.candidate_name,
                    "must not be empty",
                ));
            }
        }
        if self.storage.backend == StorageBackend::Mongodb
            && self.storage.mongodb.database.trim().is_empty()
        {
            return Err(invalid(
                "storage.mongodb.database",
                &self.storage.mongodb.database,
                "must not be empty",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
