//! Typed error handling for the invoicing ledger
//!
//! Every fallible ledger operation returns a [`BillingError`], so the HTTP
//! layer (or any other caller) can match on the category instead of a
//! generic `anyhow::Error`.
//!
//! # Error Categories
//!
//! - [`EntityError`]: a referenced record is missing or a write collided
//! - [`ValidationError`]: malformed or out-of-range input
//! - [`ConfigError`]: configuration parsing and validation
//! - [`StorageError`]: failures reported by a storage backend
//!
//! # Example
//!
//! ```rust,ignore
//! match service.add_payment(id, payment).await {
//!     Ok(invoice) => println!("status: {}", invoice.status()),
//!     Err(BillingError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("invoice {} not found", id);
//!     }
//!     Err(e) => eprintln!("payment rejected: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The main error type for ledger operations
#[derive(Debug, Error)]
pub enum BillingError {
    /// Missing records and write conflicts
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl BillingError {
    /// Shorthand for a missing record
    pub fn not_found(entity_type: &str, id: Uuid) -> Self {
        BillingError::Entity(EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        })
    }

    /// Shorthand for a rejected argument
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        BillingError::Validation(ValidationError::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        })
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Entity(e) => e.status_code(),
            BillingError::Validation(e) => e.status_code(),
            BillingError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BillingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            BillingError::Entity(e) => e.error_code(),
            BillingError::Validation(e) => e.error_code(),
            BillingError::Config(_) => "CONFIG_ERROR",
            BillingError::Storage(_) => "STORAGE_ERROR",
            BillingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            BillingError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id.to_string()
                }))
            }
            BillingError::Validation(ValidationError::InvalidArgument { field, .. }) => {
                Some(serde_json::json!({ "field": field }))
            }
            BillingError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to stored records
#[derive(Debug, Error)]
pub enum EntityError {
    /// Referenced record does not exist
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: Uuid },

    /// Write collided with another writer or a uniqueness constraint
    #[error("Conflict on {entity_type}: {message}")]
    Conflict {
        entity_type: String,
        message: String,
    },
}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::Conflict { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::Conflict { .. } => "ENTITY_CONFLICT",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A single argument is malformed or out of range
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    /// Multiple field validation errors from a request body
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Request body is not valid JSON for the expected shape
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    /// Invalid UUID format
    #[error("Invalid UUID format: {value}")]
    InvalidUuid { value: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            ValidationError::FieldErrors(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ValidationError::InvalidJson { .. } => StatusCode::BAD_REQUEST,
            ValidationError::InvalidUuid { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            ValidationError::FieldErrors(_) => "VALIDATION_ERROR",
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
            ValidationError::InvalidUuid { .. } => "INVALID_UUID",
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| FieldValidationError {
                    field: field.to_string(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {message}")]
    IoError { message: String },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection error
    #[error("Failed to connect to {backend}: {message}")]
    ConnectionError { backend: String, message: String },

    /// Insert rejected by a unique index
    #[error("Duplicate key: {message}")]
    DuplicateKey { message: String },

    /// Any other failure reported by the backend
    #[error("Storage operation failed: {message}")]
    OperationFailed { message: String },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for BillingError {
    fn from(err: serde_yaml::Error) -> Self {
        BillingError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for BillingError {
    fn from(err: std::io::Error) -> Self {
        BillingError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<uuid::Error> for BillingError {
    fn from(err: uuid::Error) -> Self {
        BillingError::Validation(ValidationError::InvalidUuid {
            value: err.to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for BillingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        BillingError::Validation(errors.into())
    }
}

/// Storage traits report `anyhow::Error`; surface those as storage failures
///
/// A typed [`StorageError`] inside the `anyhow::Error` is kept as is.
impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StorageError>() {
            Ok(storage) => BillingError::Storage(storage),
            Err(err) => BillingError::Storage(StorageError::OperationFailed {
                message: format!("{:#}", err),
            }),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for ledger operations
pub type BillingResult<T> = Result<T, BillingError>;

// =============================================================================
// Tests
// =============================================================================
