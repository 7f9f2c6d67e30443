//! Invoice lifecycle: creation, lookup, edits and deletion
//!
//! All invoice writes after creation go through [`InvoiceService::write_invoice`],
//! which re-reads the invoice, applies the change and stores it with a
//! version compare-and-swap, so two writers on the same invoice can never
//! silently overwrite each other.

use crate::config::{InvoicingConfig, NotificationConfig};
use crate::core::{
    BillingError, BillingResult, DataService, EntityError, SequenceService, StorageError,
};
use crate::entities::{Course, Invoice, Student};
use crate::ledger::calculations::{MAX_AMOUNT, reporting_offset};
use crate::ledger::receipt::{LogNotifier, Notifier};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Input for creating an invoice
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoice {
    pub student_id: Uuid,
    pub course_id: Uuid,
    /// Amount owed; defaults to the course price
    #[serde(default)]
    pub final_fees: Option<Decimal>,
}

/// Partial edit of an invoice's associations and amount owed
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoice {
    #[serde(default)]
    pub student_id: Option<Uuid>,
    #[serde(default)]
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub final_fees: Option<Decimal>,
}

/// Student fields shown next to an invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub candidate_name: String,
    pub email: String,
    pub mobile_no: String,
}

impl From<&Student> for StudentSummary {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            candidate_name: student.candidate_name.clone(),
            email: student.email.clone(),
            mobile_no: student.mobile_no.clone(),
        }
    }
}

/// Course fields shown next to an invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            price: course.price,
        }
    }
}

/// An invoice with its weak references resolved for display
///
/// `student`/`course` are `None` when the referenced record no longer exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetails {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub student: Option<StudentSummary>,
    pub course: Option<CourseSummary>,
}

/// The invoice and payment ledger
///
/// Cheap to share behind an `Arc`; every collaborator is itself shared.
pub struct InvoiceService {
    pub(super) invoices: Arc<dyn DataService<Invoice>>,
    pub(super) courses: Arc<dyn DataService<Course>>,
    pub(super) students: Arc<dyn DataService<Student>>,
    pub(super) sequences: Arc<dyn SequenceService>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) settings: InvoicingConfig,
    pub(super) notifications: NotificationConfig,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn DataService<Invoice>>,
        courses: Arc<dyn DataService<Course>>,
        students: Arc<dyn DataService<Student>>,
        sequences: Arc<dyn SequenceService>,
    ) -> Self {
        Self {
            invoices,
            courses,
            students,
            sequences,
            notifier: Arc::new(LogNotifier),
            settings: InvoicingConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: InvoicingConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationConfig) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn settings(&self) -> &InvoicingConfig {
        &self.settings
    }

    pub(super) fn reporting_offset(&self) -> FixedOffset {
        reporting_offset(self.settings.reporting_utc_offset_minutes)
    }

    /// Create an invoice for a student enrolled in a course
    ///
    /// `course_fees` snapshots the course price; `final_fees` defaults to it.
    #[instrument(skip(self, request), fields(student_id = %request.student_id, course_id = %request.course_id))]
    pub async fn create_invoice(&self, request: CreateInvoice) -> BillingResult<Invoice> {
        let course = self.resolve_course(request.course_id).await?;
        if self.settings.verify_student_exists {
            self.resolve_student(request.student_id).await?;
        }

        let final_fees = request.final_fees.unwrap_or(course.price);
        check_amount("finalFees", final_fees)?;

        let invoice_number = self.next_invoice_number().await?;
        if !self
            .invoices
            .search("invoiceNumber", &invoice_number)
            .await?
            .is_empty()
        {
            warn!(%invoice_number, "Generated invoice number already in use");
            return Err(number_taken(&invoice_number));
        }

        let invoice = Invoice::new(
            invoice_number.clone(),
            request.student_id,
            course.id,
            course.price,
            final_fees,
        );
        let invoice = match self.invoices.create(invoice).await.map_err(BillingError::from) {
            Ok(invoice) => invoice,
            Err(BillingError::Storage(StorageError::DuplicateKey { message })) => {
                warn!(%invoice_number, %message, "Invoice number taken by a concurrent create");
                return Err(number_taken(&invoice_number));
            }
            Err(e) => return Err(e),
        };

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            final_fees = %invoice.final_fees(),
            status = %invoice.status(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Fetch an invoice with its student and course resolved
    #[instrument(skip(self))]
    pub async fn get_invoice(&self, id: Uuid) -> BillingResult<InvoiceDetails> {
        let invoice = self.load_invoice(id).await?;
        let student = self.students.get(&invoice.student_id).await?;
        let course = self.courses.get(&invoice.course_id).await?;
        debug!(
            student_resolved = student.is_some(),
            course_resolved = course.is_some(),
            "Invoice loaded"
        );

        Ok(InvoiceDetails {
            student: student.as_ref().map(StudentSummary::from),
            course: course.as_ref().map(CourseSummary::from),
            invoice,
        })
    }

    /// Edit the student, course or amount owed
    ///
    /// Switching course re-snapshots `course_fees` but keeps `final_fees`
    /// unless it is passed too. The status is re-derived from the untouched
    /// ledger. A rejected edit leaves the invoice unchanged.
    #[instrument(skip(self, request))]
    pub async fn update_invoice(&self, id: Uuid, request: UpdateInvoice) -> BillingResult<Invoice> {
        // unknown invoice is reported before any problem with the request
        self.load_invoice(id).await?;

        // whether the course actually changes is decided on the fresh copy
        let new_course = match request.course_id {
            Some(course_id) => Some(self.resolve_course(course_id).await?),
            None => None,
        };
        if let Some(student_id) = request.student_id
            && self.settings.verify_student_exists
        {
            self.resolve_student(student_id).await?;
        }
        if let Some(final_fees) = request.final_fees {
            check_amount("finalFees", final_fees)?;
        }

        let allow_overpayment = self.settings.allow_overpayment;
        let invoice = self
            .write_invoice(id, |invoice| {
                if let Some(student_id) = request.student_id {
                    invoice.student_id = student_id;
                }
                if let Some(course) = &new_course
                    && invoice.course_id != course.id
                {
                    invoice.set_course(course.id, course.price);
                }
                if let Some(final_fees) = request.final_fees {
                    if !allow_overpayment && final_fees < invoice.total_paid() {
                        return Err(BillingError::invalid_argument(
                            "finalFees",
                            format!(
                                "{} is below the {} already paid",
                                final_fees,
                                invoice.total_paid()
                            ),
                        ));
                    }
                    invoice.set_final_fees(final_fees);
                }
                Ok(())
            })
            .await?;

        info!(
            invoice_id = %invoice.id,
            course_fees = %invoice.course_fees,
            final_fees = %invoice.final_fees(),
            status = %invoice.status(),
            "Invoice updated"
        );
        Ok(invoice)
    }

    /// Hard-delete an invoice; deleting an unknown id is not an error
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: Uuid) -> BillingResult<bool> {
        let removed = self.invoices.delete(&id).await?;
        if removed {
            info!(invoice_id = %id, "Invoice deleted");
        } else {
            debug!(invoice_id = %id, "Delete of unknown invoice ignored");
        }
        Ok(removed)
    }

    pub(super) async fn load_invoice(&self, id: Uuid) -> BillingResult<Invoice> {
        self.invoices
            .get(&id)
            .await?
            .ok_or_else(|| BillingError::not_found("invoice", id))
    }

    pub(super) async fn resolve_course(&self, id: Uuid) -> BillingResult<Course> {
        self.courses
            .get(&id)
            .await?
            .ok_or_else(|| BillingError::not_found("course", id))
    }

    pub(super) async fn resolve_student(&self, id: Uuid) -> BillingResult<Student> {
        self.students
            .get(&id)
            .await?
            .ok_or_else(|| BillingError::not_found("student", id))
    }

    async fn next_invoice_number(&self) -> BillingResult<String> {
        let value = self
            .sequences
            .next_value(&self.settings.sequence_name)
            .await?;
        let number = self
            .settings
            .number_base
            .checked_add(value)
            .ok_or_else(|| BillingError::Internal("invoice number overflow".to_string()))?;
        Ok(format!("{}{}", self.settings.number_prefix, number))
    }

    /// Read-modify-write an invoice with optimistic concurrency
    ///
    /// `change` runs against the freshest copy on every attempt; an error from
    /// it aborts without writing.
    pub(super) async fn write_invoice<F>(&self, id: Uuid, mut change: F) -> BillingResult<Invoice>
    where
        F: FnMut(&mut Invoice) -> BillingResult<()> + Send,
    {
        let attempts = self.settings.max_write_attempts.max(1);
        for attempt in 1..=attempts {
            let mut invoice = self.load_invoice(id).await?;
            let expected_version = invoice.version;

            change(&mut invoice)?;
            invoice.touch();

            if let Some(saved) = self
                .invoices
                .update_if_version(&id, expected_version, invoice)
                .await?
            {
                return Ok(saved);
            }
            warn!(invoice_id = %id, attempt, "Invoice changed concurrently, retrying");
        }

        Err(EntityError::Conflict {
            entity_type: "invoice".to_string(),
            message: format!(
                "invoice {} kept changing; gave up after {} attempts",
                id, attempts
            ),
        }
        .into())
    }
}

fn number_taken(invoice_number: &str) -> BillingError {
    EntityError::Conflict {
        entity_type: "invoice".to_string(),
        message: format!("invoice number {} already exists", invoice_number),
    }
    .into()
}

/// Fees must lie in `0..=MAX_AMOUNT`
pub(super) fn check_amount(field: &str, amount: Decimal) -> BillingResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        warn!(field, %amount, "Rejected negative amount");
        return Err(BillingError::invalid_argument(field, "must not be negative"));
    }
    if amount > MAX_AMOUNT {
        warn!(field, %amount, "Rejected amount above limit");
        return Err(BillingError::invalid_argument(
            field,
            format!("must not exceed {}", MAX_AMOUNT),
        ));
    }
    Ok(())
}
