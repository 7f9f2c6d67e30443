//! # LMS Invoicing
//!
//! Invoice and payment ledger for a learning-management back office.
//!
//! ## Features
//!
//! - **Invoice lifecycle**: invoices created from a student and a course, with
//!   the course price snapshotted and an optional discounted final amount
//! - **Append-only payment ledger**: payments are validated, appended and
//!   folded into a derived status (Unpaid / Partially Paid / Paid)
//! - **Analytics**: revenue, collections, monthly trend and payment-mode
//!   breakdown across every invoice
//! - **Durable invoice numbers**: generated from an atomic named counter
//! - **Optimistic concurrency**: versioned compare-and-swap writes per invoice
//! - **Receipts**: HTML receipts rendered with tera and delivered through a
//!   pluggable notifier
//! - **Storage backends**: in-memory, and MongoDB behind `mongodb_backend`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lms_invoicing::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! let host = BillingHost::in_memory(AppConfig::default());
//! let course = host.courses.create(Course::new("Data Science", dec!(10000))).await?;
//!
//! let invoice = host.service.create_invoice(CreateInvoice {
//!     student_id: Uuid::new_v4(),
//!     course_id: course.id,
//!     final_fees: None,
//! }).await?;
//!
//! let invoice = host
//!     .service
//!     .add_payment(invoice.id, RecordPayment::new(dec!(4000), "Cash"))
//!     .await?;
//! assert_eq!(invoice.status(), InvoiceStatus::PartiallyPaid);
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod ledger;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        BillingError, BillingResult, DataService, Entity, EntityError, SequenceService,
        ValidationError,
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Entities ===
    pub use crate::entities::{Course, Invoice, InvoiceStatus, Payment, PaymentMode, Student};

    // === Ledger ===
    pub use crate::ledger::{
        CreateInvoice, InvoiceDetails, InvoiceService, InvoiceSummary, LogNotifier, Notifier,
        PaymentAnalytics, PaymentHistory, ReceiptMessage, RecordPayment, SendReceipt,
        UpdateInvoice,
    };

    // === Storage ===
    pub use crate::storage::{InMemoryDataService, InMemorySequenceService};
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::{MongoDataService, MongoSequenceService};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{BillingHost, ServerBuilder};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use rust_decimal::Decimal;
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
