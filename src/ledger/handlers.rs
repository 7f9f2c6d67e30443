//! HTTP handlers for the invoice ledger
//!
//! Thin adapters: parse the request, call [`InvoiceService`], serialize the
//! result. Every failure surfaces as a [`BillingError`] response.

use crate::core::{BillingError, BillingResult, ValidationError};
use crate::entities::Invoice;
use crate::ledger::analytics::{InvoiceSummary, PaymentAnalytics};
use crate::ledger::payments::{PaymentHistory, RecordPayment};
use crate::ledger::receipt::{ReceiptDispatch, SendReceipt};
use crate::ledger::service::{CreateInvoice, InvoiceDetails, InvoiceService, UpdateInvoice};
use axum::body::Bytes;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Shared handler state
pub type LedgerState = Arc<InvoiceService>;

/// JSON body extractor that runs `validator` rules before the handler sees it
///
/// Malformed JSON is rejected with 400 `INVALID_JSON`, rule violations with
/// 422 `VALIDATION_ERROR`.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = BillingError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|e| {
            BillingError::Validation(ValidationError::InvalidJson {
                message: e.body_text(),
            })
        })?;

        payload.validate()?;

        Ok(ValidatedJson(payload))
    }
}

fn parse_id(raw: &str) -> BillingResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        BillingError::Validation(ValidationError::InvalidUuid {
            value: raw.to_string(),
        })
    })
}

/// POST /invoices, POST /invoices/create
pub async fn create_invoice(
    State(service): State<LedgerState>,
    ValidatedJson(request): ValidatedJson<CreateInvoice>,
) -> BillingResult<(StatusCode, Json<Invoice>)> {
    let invoice = service.create_invoice(request).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /invoices
pub async fn list_invoices(
    State(service): State<LedgerState>,
) -> BillingResult<Json<Vec<InvoiceSummary>>> {
    Ok(Json(service.list_with_analytics().await?))
}

/// GET /invoices/analytics
pub async fn get_payment_analytics(
    State(service): State<LedgerState>,
) -> BillingResult<Json<PaymentAnalytics>> {
    Ok(Json(service.payment_analytics().await?))
}

/// GET /invoices/{id}
pub async fn get_invoice(
    State(service): State<LedgerState>,
    Path(id): Path<String>,
) -> BillingResult<Json<InvoiceDetails>> {
    let id = parse_id(&id)?;
    Ok(Json(service.get_invoice(id).await?))
}

/// GET /invoices/{id}/payment-history
pub async fn get_payment_history(
    State(service): State<LedgerState>,
    Path(id): Path<String>,
) -> BillingResult<Json<PaymentHistory>> {
    let id = parse_id(&id)?;
    Ok(Json(service.payment_history(id).await?))
}

/// PUT /invoices/add-payment/{id}, POST /invoices/{id}/payments
pub async fn add_payment(
    State(service): State<LedgerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<RecordPayment>,
) -> BillingResult<Json<Invoice>> {
    let id = parse_id(&id)?;
    Ok(Json(service.add_payment(id, request).await?))
}

/// PUT /invoices/{id}
pub async fn update_invoice(
    State(service): State<LedgerState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateInvoice>,
) -> BillingResult<Json<Invoice>> {
    let id = parse_id(&id)?;
    Ok(Json(service.update_invoice(id, request).await?))
}

/// DELETE /invoices/{id}
pub async fn delete_invoice(
    State(service): State<LedgerState>,
    Path(id): Path<String>,
) -> BillingResult<Json<Value>> {
    let id = parse_id(&id)?;
    service.delete_invoice(id).await?;
    Ok(Json(json!({ "message": "Invoice deleted" })))
}

/// POST /invoices/{id}/send-email
///
/// The body is optional; an empty body sends the full history to the
/// student's address on file.
pub async fn send_receipt(
    State(service): State<LedgerState>,
    Path(id): Path<String>,
    body: Bytes,
) -> BillingResult<(StatusCode, Json<ReceiptDispatch>)> {
    let id = parse_id(&id)?;
    let request: SendReceipt = if body.iter().all(u8::is_ascii_whitespace) {
        SendReceipt::default()
    } else {
        serde_json::from_slice(&body)?
    };
    request.validate()?;

    let dispatch = service.send_receipt(id, request).await?;
    Ok((StatusCode::ACCEPTED, Json(dispatch)))
}
