//! Payment receipts
//!
//! Receipts are rendered from a tera template and handed to a [`Notifier`] on
//! a background task. Delivery is fire-and-forget: a failing notifier is
//! logged and never undoes the ledger write that triggered it.

use crate::core::{BillingError, BillingResult};
use crate::entities::{Invoice, Payment};
use crate::ledger::service::InvoiceService;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivery channel for receipts (mail relay, queue, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: ReceiptMessage) -> Result<()>;
}

/// Notifier that only logs what it would have sent
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: ReceiptMessage) -> Result<()> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            bytes = message.html_body.len(),
            "Receipt ready for delivery"
        );
        Ok(())
    }
}

/// Input for sending a receipt by hand
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    /// Defaults to the student's email
    #[validate(email(message = "recipient must be an email address"))]
    #[serde(default)]
    pub recipient: Option<String>,

    /// Zero-based ledger position of the payment to acknowledge; the whole
    /// ledger is listed when absent
    #[serde(default)]
    pub payment_index: Option<usize>,
}

/// What was handed to the notifier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDispatch {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub recipient: String,
    pub subject: String,
    /// False when notifications are disabled and the receipt was only rendered
    pub queued: bool,
}

const RECEIPT_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>{{ organization }}</h2>
  <h3>Payment Receipt</h3>
  <p>Dear {{ student_name }},</p>
  <p>Thank you for your payment towards <strong>{{ course_title }}</strong>.</p>
  <table cellpadding="6" style="border-collapse: collapse;">
    <tr><td>Invoice Number</td><td>{{ invoice_number }}</td></tr>
    <tr><td>Invoice Date</td><td>{{ invoice_date }}</td></tr>
    <tr><td>Course Fees</td><td>{{ course_fees }}</td></tr>
    <tr><td>Final Fees</td><td>{{ final_fees }}</td></tr>
    <tr><td>Total Paid</td><td>{{ total_paid }}</td></tr>
    <tr><td>Balance</td><td>{{ balance }}</td></tr>
    <tr><td>Status</td><td>{{ status }}</td></tr>
  </table>
  <h4>{% if single_payment %}Payment Received{% else %}Payment History{% endif %}</h4>
  {% if payments | length > 0 %}
  <table cellpadding="6" border="1" style="border-collapse: collapse;">
    <tr><th>Date</th><th>Mode</th><th>Amount</th></tr>
    {% for payment in payments %}
    <tr><td>{{ payment.date }}</td><td>{{ payment.mode }}</td><td>{{ payment.amount }}</td></tr>
    {% endfor %}
  </table>
  {% else %}
  <p>No payments recorded yet.</p>
  {% endif %}
</div>
"#;

#[derive(Serialize)]
struct ReceiptView {
    organization: String,
    student_name: String,
    course_title: String,
    invoice_number: String,
    invoice_date: String,
    course_fees: String,
    final_fees: String,
    total_paid: String,
    balance: String,
    status: String,
    single_payment: bool,
    payments: Vec<PaymentLine>,
}

#[derive(Serialize)]
struct PaymentLine {
    date: String,
    mode: String,
    amount: String,
}

impl From<&Payment> for PaymentLine {
    fn from(payment: &Payment) -> Self {
        Self {
            date: payment.date.format("%d %b %Y").to_string(),
            mode: payment.mode.to_string(),
            amount: money(payment.amount_paid),
        }
    }
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Receipt subject line for an invoice
pub fn receipt_subject(invoice: &Invoice) -> String {
    format!("Payment Receipt - {}", invoice.invoice_number)
}

/// Render the HTML receipt body
///
/// With `payment_index` only that payment is listed; otherwise the whole ledger.
pub fn render_receipt(
    invoice: &Invoice,
    organization: &str,
    student_name: &str,
    course_title: &str,
    payment_index: Option<usize>,
) -> BillingResult<String> {
    let payments: Vec<PaymentLine> = match payment_index {
        Some(index) => {
            let payment = invoice.payment_history().get(index).ok_or_else(|| {
                BillingError::invalid_argument(
                    "paymentIndex",
                    format!(
                        "invoice has {} payments, no index {}",
                        invoice.payment_history().len(),
                        index
                    ),
                )
            })?;
            vec![PaymentLine::from(payment)]
        }
        None => invoice
            .payment_history()
            .iter()
            .map(PaymentLine::from)
            .collect(),
    };

    let view = ReceiptView {
        organization: organization.to_string(),
        student_name: student_name.to_string(),
        course_title: course_title.to_string(),
        invoice_number: invoice.invoice_number.clone(),
        invoice_date: invoice.invoice_date.format("%d %b %Y").to_string(),
        course_fees: money(invoice.course_fees),
        final_fees: money(invoice.final_fees()),
        total_paid: money(invoice.total_paid()),
        balance: money(invoice.balance()),
        status: invoice.status().to_string(),
        single_payment: payment_index.is_some(),
        payments,
    };

    let context = Context::from_serialize(&view)
        .map_err(|e| BillingError::Internal(format!("receipt context: {}", e)))?;
    Tera::one_off(RECEIPT_TEMPLATE, &context, true)
        .map_err(|e| BillingError::Internal(format!("receipt template: {}", e)))
}

impl InvoiceService {
    /// Render a receipt for an invoice and queue it for delivery
    #[instrument(skip(self, request))]
    pub async fn send_receipt(
        &self,
        id: Uuid,
        request: SendReceipt,
    ) -> BillingResult<ReceiptDispatch> {
        let invoice = self.load_invoice(id).await?;
        self.dispatch_receipt(&invoice, request.recipient, request.payment_index)
            .await
    }

    pub(super) async fn dispatch_receipt(
        &self,
        invoice: &Invoice,
        recipient: Option<String>,
        payment_index: Option<usize>,
    ) -> BillingResult<ReceiptDispatch> {
        let student = self.students.get(&invoice.student_id).await?;
        let course = self.courses.get(&invoice.course_id).await?;

        let recipient = recipient
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .or_else(|| {
                student
                    .as_ref()
                    .map(|s| s.email.trim().to_string())
                    .filter(|e| !e.is_empty())
            })
            .ok_or_else(|| {
                BillingError::invalid_argument(
                    "recipient",
                    "no recipient given and the student has no email on file",
                )
            })?;

        let student_name = student
            .as_ref()
            .map(|s| s.candidate_name.as_str())
            .unwrap_or("Student");
        let course_title = course
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or("your course");

        let html_body = render_receipt(
            invoice,
            &self.notifications.organization_name,
            student_name,
            course_title,
            payment_index,
        )?;
        let message = ReceiptMessage {
            recipient: recipient.clone(),
            subject: receipt_subject(invoice),
            html_body,
        };
        let dispatch = ReceiptDispatch {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            recipient,
            subject: message.subject.clone(),
            queued: self.notifications.enabled,
        };

        if !self.notifications.enabled {
            info!(
                invoice_number = %dispatch.invoice_number,
                "Notifications disabled, receipt rendered only"
            );
            return Ok(dispatch);
        }

        let notifier = Arc::clone(&self.notifier);
        let invoice_number = invoice.invoice_number.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(message).await {
                warn!(%invoice_number, error = %e, "Receipt delivery failed");
            }
        });

        info!(
            invoice_number = %dispatch.invoice_number,
            recipient = %dispatch.recipient,
            "Receipt queued"
        );
        Ok(dispatch)
    }
}
