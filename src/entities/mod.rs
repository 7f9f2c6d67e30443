//! Stored record types
//!
//! Invoices are owned by the ledger; courses and students come from the
//! catalog and directory and are only read here.

pub mod course;
pub mod invoice;
pub mod macros;
pub mod student;

pub use course::Course;
pub use invoice::{Invoice, InvoiceStatus, Payment, PaymentMode};
pub use student::Student;
