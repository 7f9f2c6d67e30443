//! Invoice and payment ledger
//!
//! - [`service`]: invoice lifecycle (create, read, edit, delete)
//! - [`payments`]: payment recording and per-invoice history
//! - [`analytics`]: system-wide figures
//! - [`receipt`]: receipt rendering and delivery
//! - [`calculations`]: the derived-figure rules shared by all of the above

pub mod analytics;
pub mod calculations;
pub mod handlers;
pub mod payments;
pub mod receipt;
pub mod service;

pub use analytics::{AnalyticsAccumulator, InvoiceSummary, MonthlyTotal, PaymentAnalytics};
pub use calculations::MonthKey;
pub use payments::{MonthlyPaymentGroup, PaymentHistory, RecordPayment};
pub use receipt::{LogNotifier, Notifier, ReceiptDispatch, ReceiptMessage, SendReceipt};
pub use service::{
    CourseSummary, CreateInvoice, InvoiceDetails, InvoiceService, StudentSummary, UpdateInvoice,
};
