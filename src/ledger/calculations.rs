//! Derived ledger figures
//!
//! Every place that turns a payment ledger into totals, a status or a month
//! bucket goes through these functions, so the invoice, the per-invoice
//! history view and the system-wide analytics can never disagree.

use crate::entities::{InvoiceStatus, Payment};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Largest amount accepted for fees or a single payment
///
/// Keeps every ledger and system-wide sum far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Sum of every amount in the ledger, or `None` if it does not fit a `Decimal`
pub fn checked_total(payments: &[Payment]) -> Option<Decimal> {
    payments
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.amount_paid))
}

/// Sum of every amount in the ledger
///
/// Saturates at `Decimal::MAX` for records written before amounts were
/// bounded; writers use [`checked_total`] to refuse such ledgers instead.
pub fn total_paid(payments: &[Payment]) -> Decimal {
    checked_total(payments).unwrap_or(Decimal::MAX)
}

/// The status rule: paid once the ledger covers the fees, partially paid
/// once anything was received, unpaid otherwise
pub fn derive_status(total_paid: Decimal, final_fees: Decimal) -> InvoiceStatus {
    if total_paid >= final_fees {
        InvoiceStatus::Paid
    } else if total_paid > Decimal::ZERO {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Unpaid
    }
}

/// Outstanding amount; negative when overpaid
pub fn balance(final_fees: Decimal, total_paid: Decimal) -> Decimal {
    final_fees - total_paid
}

/// Share of the fees received, as a percentage rounded to two places
///
/// Not clamped: an overpaid invoice reports more than 100. An invoice that
/// owes nothing reports 0.
pub fn payment_percentage(total_paid: Decimal, final_fees: Decimal) -> Decimal {
    if final_fees.is_zero() {
        return Decimal::ZERO;
    }
    total_paid
        .checked_div(final_fees)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .map(round2)
        .unwrap_or(Decimal::MAX)
}

/// Round half away from zero to two decimal places
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fixed offset used for calendar bucketing, from minutes east of UTC
///
/// Out-of-range values fall back to UTC; configuration validation rejects
/// them before they get here.
pub fn reporting_offset(minutes_east: i32) -> FixedOffset {
    minutes_east
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Calendar month used as a grouping key
///
/// Ordered by year, then month. The human label ("October 2026") is only
/// produced for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Month containing `date` as seen from `offset`
    pub fn of(date: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = date.with_timezone(&offset);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    /// English "Month Year" label
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{:04}-{:02}", self.year, self.month))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
