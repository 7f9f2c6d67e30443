//! Invoice entity and its embedded payment ledger

use crate::impl_entity;
use crate::ledger::calculations;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Derived payment completeness of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Unpaid,
    #[serde(rename = "Partially Paid", alias = "PartiallyPaid")]
    PartiallyPaid,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "Unpaid",
            InvoiceStatus::PartiallyPaid => "Partially Paid",
            InvoiceStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a payment was made
///
/// Storage accepts any tag; the five named modes are the ones offered to
/// users. Unknown tags are kept verbatim in [`PaymentMode::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMode {
    Cash,
    Upi,
    Card,
    BankTransfer,
    Cheque,
    Other(String),
}

impl PaymentMode {
    /// Modes accepted when strict payment modes are enabled
    pub const STANDARD: [&'static str; 5] = ["Cash", "UPI", "Card", "Bank Transfer", "Cheque"];

    pub fn as_str(&self) -> &str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Upi => "UPI",
            PaymentMode::Card => "Card",
            PaymentMode::BankTransfer => "Bank Transfer",
            PaymentMode::Cheque => "Cheque",
            PaymentMode::Other(tag) => tag,
        }
    }

    pub fn is_standard(&self) -> bool {
        !matches!(self, PaymentMode::Other(_))
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<String> for PaymentMode {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "Cash" => PaymentMode::Cash,
            "UPI" => PaymentMode::Upi,
            "Card" => PaymentMode::Card,
            "Bank Transfer" => PaymentMode::BankTransfer,
            "Cheque" => PaymentMode::Cheque,
            _ => PaymentMode::Other(tag),
        }
    }
}

impl From<&str> for PaymentMode {
    fn from(tag: &str) -> Self {
        PaymentMode::from(tag.to_string())
    }
}

impl From<PaymentMode> for String {
    fn from(mode: PaymentMode) -> Self {
        match mode {
            PaymentMode::Other(tag) => tag,
            standard => standard.as_str().to_string(),
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of an invoice's append-only payment ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub amount_paid: Decimal,
    pub mode: PaymentMode,
    pub date: DateTime<Utc>,
}

impl Payment {
    pub fn new(amount_paid: Decimal, mode: impl Into<PaymentMode>, date: DateTime<Utc>) -> Self {
        Self {
            amount_paid,
            mode: mode.into(),
            date,
        }
    }
}

/// A billing record linking one student to one course
///
/// `status` is derived from the ledger and `final_fees`; both mutators
/// that can move it ([`Invoice::record_payment`] and
/// [`Invoice::set_final_fees`]) re-run the same rule, so the field is never
/// set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub invoice_date: DateTime<Utc>,
    pub course_fees: Decimal,
    final_fees: Decimal,
    status: InvoiceStatus,
    #[serde(default)]
    payment_history: Vec<Payment>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_entity!(Invoice, "invoice", "invoices", versioned);

impl Invoice {
    pub fn new(
        invoice_number: impl Into<String>,
        student_id: Uuid,
        course_id: Uuid,
        course_fees: Decimal,
        final_fees: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            invoice_number: invoice_number.into(),
            student_id,
            course_id,
            invoice_date: now,
            course_fees,
            final_fees,
            status: calculations::derive_status(Decimal::ZERO, final_fees),
            payment_history: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn final_fees(&self) -> Decimal {
        self.final_fees
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn payment_history(&self) -> &[Payment] {
        &self.payment_history
    }

    pub fn total_paid(&self) -> Decimal {
        calculations::total_paid(&self.payment_history)
    }

    pub fn balance(&self) -> Decimal {
        calculations::balance(self.final_fees, self.total_paid())
    }

    pub fn payment_percentage(&self) -> Decimal {
        calculations::payment_percentage(self.total_paid(), self.final_fees)
    }

    /// Append a payment to the ledger and re-derive the status
    pub fn record_payment(&mut self, payment: Payment) {
        self.payment_history.push(payment);
        self.refresh_status();
    }

    /// Change the amount owed and re-derive the status against the existing ledger
    pub fn set_final_fees(&mut self, final_fees: Decimal) {
        self.final_fees = final_fees;
        self.refresh_status();
    }

    /// Point the invoice at another course, snapshotting its current price
    pub fn set_course(&mut self, course_id: Uuid, course_fees: Decimal) {
        self.course_id = course_id;
        self.course_fees = course_fees;
    }

    /// Mark a write: bump the optimistic version and the update timestamp
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn refresh_status(&mut self) {
        self.status = calculations::derive_status(self.total_paid(), self.final_fees);
    }
}
