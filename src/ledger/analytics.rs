//! Analytics aggregator
//!
//! Recomputed from a full scan on every call. The folding itself lives in
//! [`AnalyticsAccumulator`] so it can later be fed incrementally without
//! changing the reported shape.

use crate::core::{BillingError, BillingResult};
use crate::entities::Invoice;
use crate::ledger::calculations::MonthKey;
use crate::ledger::service::{CourseSummary, InvoiceService, StudentSummary};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// An invoice alongside its derived payment figures
///
/// `student`/`course` are `None` when the referenced record no longer exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub student: Option<StudentSummary>,
    pub course: Option<CourseSummary>,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub payment_percentage: Decimal,
}

impl InvoiceSummary {
    pub fn new(
        invoice: Invoice,
        student: Option<StudentSummary>,
        course: Option<CourseSummary>,
    ) -> Self {
        Self {
            student,
            course,
            total_paid: invoice.total_paid(),
            balance: invoice.balance(),
            payment_percentage: invoice.payment_percentage(),
            invoice,
        }
    }
}

/// Sum of all payments received in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    pub month: String,
    pub year: i32,
    pub month_number: u32,
    pub amount: Decimal,
}

/// System-wide payment figures
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAnalytics {
    pub total_revenue: Decimal,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub total_invoices: usize,
    /// Ascending by month
    pub monthly_payments: Vec<MonthlyTotal>,
    pub payment_mode_breakdown: BTreeMap<String, Decimal>,
}

/// Running totals over a set of invoices
#[derive(Debug, Clone)]
pub struct AnalyticsAccumulator {
    offset: FixedOffset,
    total_revenue: Decimal,
    total_paid: Decimal,
    total_invoices: usize,
    monthly: BTreeMap<MonthKey, Decimal>,
    by_mode: BTreeMap<String, Decimal>,
}

impl AnalyticsAccumulator {
    /// Start empty, bucketing months as seen from `offset`
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            total_revenue: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            total_invoices: 0,
            monthly: BTreeMap::new(),
            by_mode: BTreeMap::new(),
        }
    }

    /// Fold one invoice snapshot into the totals
    ///
    /// Fails once a running total leaves the `Decimal` range; the accumulator
    /// is then only partly updated and should be dropped.
    pub fn add_invoice(&mut self, invoice: &Invoice) -> BillingResult<()> {
        self.total_invoices += 1;
        accumulate(&mut self.total_revenue, invoice.final_fees())?;
        for payment in invoice.payment_history() {
            accumulate(&mut self.total_paid, payment.amount_paid)?;
            accumulate(
                self.monthly
                    .entry(MonthKey::of(payment.date, self.offset))
                    .or_insert(Decimal::ZERO),
                payment.amount_paid,
            )?;

            let mode = payment.mode.as_str().trim();
            if !mode.is_empty() {
                accumulate(
                    self.by_mode
                        .entry(mode.to_string())
                        .or_insert(Decimal::ZERO),
                    payment.amount_paid,
                )?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> PaymentAnalytics {
        PaymentAnalytics {
            total_revenue: self.total_revenue,
            total_paid: self.total_paid,
            total_pending: self.total_revenue - self.total_paid,
            total_invoices: self.total_invoices,
            monthly_payments: self
                .monthly
                .into_iter()
                .map(|(key, amount)| MonthlyTotal {
                    month: key.label(),
                    year: key.year,
                    month_number: key.month,
                    amount,
                })
                .collect(),
            payment_mode_breakdown: self.by_mode,
        }
    }
}

fn accumulate(total: &mut Decimal, amount: Decimal) -> BillingResult<()> {
    *total = total.checked_add(amount).ok_or_else(|| {
        BillingError::Internal("payment totals exceed the supported range".to_string())
    })?;
    Ok(())
}

impl InvoiceService {
    /// Every invoice, newest first, with totals, balance and percentage attached
    ///
    /// Students and courses are fetched once for the whole list.
    #[instrument(skip(self))]
    pub async fn list_with_analytics(&self) -> BillingResult<Vec<InvoiceSummary>> {
        let invoices = self.invoices.list().await?;
        let students: HashMap<Uuid, StudentSummary> = self
            .students
            .list()
            .await?
            .iter()
            .map(|s| (s.id, StudentSummary::from(s)))
            .collect();
        let courses: HashMap<Uuid, CourseSummary> = self
            .courses
            .list()
            .await?
            .iter()
            .map(|c| (c.id, CourseSummary::from(c)))
            .collect();
        debug!(
            count = invoices.len(),
            students = students.len(),
            courses = courses.len(),
            "Invoices listed"
        );

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let student = students.get(&invoice.student_id).cloned();
                let course = courses.get(&invoice.course_id).cloned();
                InvoiceSummary::new(invoice, student, course)
            })
            .collect())
    }

    /// Revenue, collections, monthly trend and mode breakdown across all invoices
    #[instrument(skip(self))]
    pub async fn payment_analytics(&self) -> BillingResult<PaymentAnalytics> {
        let invoices = self.invoices.list().await?;

        let mut acc = AnalyticsAccumulator::new(self.reporting_offset());
        for invoice in &invoices {
            if let Err(e) = acc.add_invoice(invoice) {
                warn!(invoice_id = %invoice.id, error = %e, "Analytics aborted");
                return Err(e);
            }
        }
        let analytics = acc.finish();

        debug!(
            invoices = analytics.total_invoices,
            total_revenue = %analytics.total_revenue,
            total_paid = %analytics.total_paid,
            "Payment analytics computed"
        );
        Ok(analytics)
    }
}
