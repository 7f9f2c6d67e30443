//! Core module containing the fundamental traits and types of the ledger

pub mod entity;
pub mod error;
pub mod service;

pub use entity::Entity;
pub use error::{
    BillingError, BillingResult, ConfigError, EntityError, ErrorResponse, FieldValidationError,
    StorageError, ValidationError,
};
pub use service::{DataService, SequenceService};
