//! Payment ledger engine
//!
//! Appends payments to an invoice and serves the per-invoice history view.

use crate::core::{BillingError, BillingResult};
use crate::entities::{Invoice, Payment, PaymentMode};
use crate::ledger::calculations::{self, MonthKey};
use crate::ledger::service::{CourseSummary, InvoiceService, StudentSummary};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Input for recording a payment
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayment {
    pub amount_paid: Decimal,
    #[validate(length(min = 1, message = "payment mode is required"))]
    pub mode: String,
    /// When the money was received; defaults to now
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl RecordPayment {
    pub fn new(amount_paid: Decimal, mode: impl Into<String>) -> Self {
        Self {
            amount_paid,
            mode: mode.into(),
            date: None,
        }
    }

    pub fn on(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

/// Payments received in one calendar month of one invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPaymentGroup {
    pub month: String,
    pub year: i32,
    pub month_number: u32,
    pub total_amount: Decimal,
    pub payments: Vec<Payment>,
}

/// Per-invoice ledger view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHistory {
    pub invoice: Invoice,
    pub student: Option<StudentSummary>,
    pub course: Option<CourseSummary>,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub payment_percentage: Decimal,
    /// Ascending by month
    pub monthly_payments: Vec<MonthlyPaymentGroup>,
}

impl InvoiceService {
    /// Append a payment and re-derive the invoice status
    ///
    /// Rejected payments leave the invoice untouched.
    #[instrument(skip(self, request), fields(amount = %request.amount_paid, mode = %request.mode))]
    pub async fn add_payment(&self, id: Uuid, request: RecordPayment) -> BillingResult<Invoice> {
        let mode = self.check_payment(&request)?;
        let payment = Payment::new(
            request.amount_paid,
            mode,
            request.date.unwrap_or_else(Utc::now),
        );

        let allow_overpayment = self.settings.allow_overpayment;
        let invoice = self
            .write_invoice(id, |invoice| {
                let paid_after = calculations::checked_total(invoice.payment_history())
                    .and_then(|paid| paid.checked_add(payment.amount_paid));
                if paid_after.is_none() {
                    warn!(invoice_id = %invoice.id, "Rejected payment past the ledger's range");
                    return Err(BillingError::invalid_argument(
                        "amountPaid",
                        "ledger total would exceed the supported range",
                    ));
                }
                if !allow_overpayment {
                    let outstanding = invoice.balance();
                    if payment.amount_paid > outstanding {
                        warn!(
                            invoice_id = %invoice.id,
                            %outstanding,
                            "Rejected payment above outstanding balance"
                        );
                        return Err(BillingError::invalid_argument(
                            "amountPaid",
                            format!(
                                "{} exceeds the outstanding balance of {}",
                                payment.amount_paid,
                                outstanding.max(Decimal::ZERO)
                            ),
                        ));
                    }
                }
                invoice.record_payment(payment.clone());
                Ok(())
            })
            .await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total_paid = %invoice.total_paid(),
            status = %invoice.status(),
            "Payment recorded"
        );

        if self.notifications.send_on_payment {
            let index = invoice.payment_history().len().saturating_sub(1);
            if let Err(e) = self.dispatch_receipt(&invoice, None, Some(index)).await {
                warn!(invoice_id = %invoice.id, error = %e, "Automatic receipt not sent");
            }
        }

        Ok(invoice)
    }

    /// Totals plus the ledger grouped by calendar month
    #[instrument(skip(self))]
    pub async fn payment_history(&self, id: Uuid) -> BillingResult<PaymentHistory> {
        let invoice = self.load_invoice(id).await?;
        let student = self.students.get(&invoice.student_id).await?;
        let course = self.courses.get(&invoice.course_id).await?;
        let offset = self.reporting_offset();

        let mut months: BTreeMap<MonthKey, Vec<Payment>> = BTreeMap::new();
        for payment in invoice.payment_history() {
            months
                .entry(MonthKey::of(payment.date, offset))
                .or_default()
                .push(payment.clone());
        }

        let monthly_payments = months
            .into_iter()
            .map(|(key, payments)| MonthlyPaymentGroup {
                month: key.label(),
                year: key.year,
                month_number: key.month,
                total_amount: calculations::total_paid(&payments),
                payments,
            })
            .collect();

        Ok(PaymentHistory {
            student: student.as_ref().map(StudentSummary::from),
            course: course.as_ref().map(CourseSummary::from),
            total_paid: invoice.total_paid(),
            balance: invoice.balance(),
            payment_percentage: invoice.payment_percentage(),
            monthly_payments,
            invoice,
        })
    }

    fn check_payment(&self, request: &RecordPayment) -> BillingResult<PaymentMode> {
        if request.amount_paid <= Decimal::ZERO {
            warn!(amount = %request.amount_paid, "Rejected non-positive payment");
            return Err(BillingError::invalid_argument(
                "amountPaid",
                "must be greater than zero",
            ));
        }
        if request.amount_paid > calculations::MAX_AMOUNT {
            warn!(amount = %request.amount_paid, "Rejected payment above limit");
            return Err(BillingError::invalid_argument(
                "amountPaid",
                format!("must not exceed {}", calculations::MAX_AMOUNT),
            ));
        }

        let mode = PaymentMode::from(request.mode.trim().to_string());
        if mode.is_blank() {
            return Err(BillingError::invalid_argument("mode", "payment mode is required"));
        }
        if self.settings.strict_payment_modes && !mode.is_standard() {
            return Err(BillingError::invalid_argument(
                "mode",
                format!(
                    "'{}' is not one of {}",
                    mode,
                    PaymentMode::STANDARD.join(", ")
                ),
            ));
        }
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvoicingConfig;
    use crate::core::DataService;
    use crate::entities::{Course, InvoiceStatus, Student};
    use crate::ledger::service::CreateInvoice;
    use crate::storage::{InMemoryDataService, InMemorySequenceService};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn service_with_invoice(
        settings: InvoicingConfig,
        fees: Decimal,
    ) -> (InvoiceService, Invoice) {
        let courses = Arc::new(InMemoryDataService::<Course>::new());
        let course = courses
            .create(Course::new("Full Stack", fees))
            .await
            .unwrap();
        let service = InvoiceService::new(
            Arc::new(InMemoryDataService::<Invoice>::new()),
            courses,
            Arc::new(InMemoryDataService::<Student>::new()),
            Arc::new(InMemorySequenceService::new()),
        )
        .with_settings(settings);
        let invoice = service
            .create_invoice(CreateInvoice {
                student_id: Uuid::new_v4(),
                course_id: course.id,
                final_fees: None,
            })
            .await
            .unwrap();
        (service, invoice)
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amounts() {
        let (service, invoice) =
            service_with_invoice(InvoicingConfig::default(), dec!(1000)).await;

        for amount in [dec!(0), dec!(-50)] {
            let err = service
                .add_payment(invoice.id, RecordPayment::new(amount, "Cash"))
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        }

        let stored = service.load_invoice(invoice.id).await.unwrap();
        assert!(stored.payment_history().is_empty());
        assert_eq!(stored.status(), InvoiceStatus::Unpaid);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_rejects_overpayment_by_default() {
        let (service, invoice) =
            service_with_invoice(InvoicingConfig::default(), dec!(1000)).await;

        service
            .add_payment(invoice.id, RecordPayment::new(dec!(600), "Cash"))
            .await
            .unwrap();
        let err = service
            .add_payment(invoice.id, RecordPayment::new(dec!(401), "Cash"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("amountPaid"));

        let stored = service.load_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.total_paid(), dec!(600));
        assert_eq!(stored.status(), InvoiceStatus::PartiallyPaid);
    }

    #[tokio::test]
    async fn test_overpayment_allowed_when_configured() {
        let settings = InvoicingConfig {
            allow_overpayment: true,
            ..Default::default()
        };
        let (service, invoice) = service_with_invoice(settings, dec!(1000)).await;

        let paid = service
            .add_payment(invoice.id, RecordPayment::new(dec!(1500), "UPI"))
            .await
            .unwrap();
        assert_eq!(paid.status(), InvoiceStatus::Paid);
        assert_eq!(paid.balance(), dec!(-500));
        assert_eq!(paid.payment_percentage(), dec!(150));
    }

    #[tokio::test]
    async fn test_mode_rules() {
        let (service, invoice) =
            service_with_invoice(InvoicingConfig::default(), dec!(1000)).await;

        let err = service
            .add_payment(invoice.id, RecordPayment::new(dec!(10), "   "))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mode"));

        // open set by default
        let paid = service
            .add_payment(invoice.id, RecordPayment::new(dec!(10), "Wallet"))
            .await
            .unwrap();
        assert_eq!(
            paid.payment_history()[0].mode,
            PaymentMode::Other("Wallet".to_string())
        );

        let strict = InvoicingConfig {
            strict_payment_modes: true,
            ..Default::default()
        };
        let (service, invoice) = service_with_invoice(strict, dec!(1000)).await;
        assert!(
            service
                .add_payment(invoice.id, RecordPayment::new(dec!(10), "Wallet"))
                .await
                .is_err()
        );
        assert!(
            service
                .add_payment(invoice.id, RecordPayment::new(dec!(10), "Bank Transfer"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_unknown_invoice_is_not_found() {
        let (service, _) = service_with_invoice(InvoicingConfig::default(), dec!(1000)).await;
        let err = service
            .add_payment(Uuid::new_v4(), RecordPayment::new(dec!(10), "Cash"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
        assert!(service.payment_history(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_history_groups_by_month() {
        let (service, invoice) =
            service_with_invoice(InvoicingConfig::default(), dec!(10000)).await;

        let march = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        let march_late = Utc.with_ymd_and_hms(2026, 3, 28, 16, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();

        for (amount, date) in [(dec!(1000), march), (dec!(500), march_late), (dec!(2000), january)] {
            service
                .add_payment(invoice.id, RecordPayment::new(amount, "Cash").on(date))
                .await
                .unwrap();
        }

        let history = service.payment_history(invoice.id).await.unwrap();
        assert_eq!(history.total_paid, dec!(3500));
        assert_eq!(history.balance, dec!(6500));
        assert_eq!(history.payment_percentage, dec!(35));
        assert_eq!(history.monthly_payments.len(), 2);
        assert_eq!(history.monthly_payments[0].month, "January 2026");
        assert_eq!(history.monthly_payments[0].total_amount, dec!(2000));
        assert_eq!(history.monthly_payments[1].month, "March 2026");
        assert_eq!(history.monthly_payments[1].month_number, 3);
        assert_eq!(history.monthly_payments[1].total_amount, dec!(1500));
        assert_eq!(history.monthly_payments[1].payments.len(), 2);
        assert_eq!(history.course.as_ref().unwrap().title, "Full Stack");
        // student id was never registered
        assert!(history.student.is_none());
    }

    #[tokio::test]
    async fn test_rejects_amount_above_limit_even_with_overpayment() {
        let settings = InvoicingConfig {
            allow_overpayment: true,
            ..Default::default()
        };
        let (service, invoice) = service_with_invoice(settings, dec!(1000)).await;

        let err = service
            .add_payment(
                invoice.id,
                RecordPayment::new(dec!(50000000000000000000000000000), "Cash"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert!(err.to_string().contains("amountPaid"));

        service
            .add_payment(invoice.id, RecordPayment::new(calculations::MAX_AMOUNT, "Cash"))
            .await
            .unwrap();
        let stored = service.load_invoice(invoice.id).await.unwrap();
        assert_eq!(stored.total_paid(), calculations::MAX_AMOUNT);
    }

    #[tokio::test]
    async fn test_payment_onto_saturated_ledger_is_rejected() {
        let settings = InvoicingConfig {
            allow_overpayment: true,
            ..Default::default()
        };
        let (service, _) = service_with_invoice(settings, dec!(1000)).await;

        let mut legacy = Invoice::new("INV9", Uuid::new_v4(), Uuid::new_v4(), dec!(10), dec!(10));
        legacy.record_payment(Payment::new(Decimal::MAX, "Cash", Utc::now()));
        let legacy = service.invoices.create(legacy).await.unwrap();

        let err = service
            .add_payment(legacy.id, RecordPayment::new(dec!(1), "Cash"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert_eq!(service.load_invoice(legacy.id).await.unwrap().version, 0);
    }
}
