//! Router builder utilities for the ledger routes

use crate::ledger::handlers::{
    LedgerState, add_payment, create_invoice, delete_invoice, get_invoice,
    get_payment_analytics, get_payment_history, list_invoices, send_receipt, update_invoice,
};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

/// Build the invoice routes
///
/// - POST /invoices, POST /invoices/create - Create an invoice
/// - GET /invoices - List invoices with payment figures
/// - GET /invoices/analytics - System-wide payment analytics
/// - GET /invoices/{id} - Invoice with student and course resolved
/// - GET /invoices/{id}/payment-history - Ledger grouped by month
/// - PUT /invoices/add-payment/{id}, POST /invoices/{id}/payments - Record a payment
/// - PUT /invoices/{id} - Edit student, course or final fees
/// - DELETE /invoices/{id} - Delete an invoice
/// - POST /invoices/{id}/send-email - Queue a payment receipt
pub fn build_invoice_routes(state: LedgerState) -> Router {
    Router::new()
        .route("/invoices", post(create_invoice).get(list_invoices))
        .route("/invoices/create", post(create_invoice))
        .route("/invoices/analytics", get(get_payment_analytics))
        .route("/invoices/add-payment/{id}", put(add_payment))
        .route(
            "/invoices/{id}",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/invoices/{id}/payment-history", get(get_payment_history))
        .route("/invoices/{id}/payments", post(add_payment))
        .route("/invoices/{id}/send-email", post(send_receipt))
        .with_state(state)
}

/// Build health check routes
pub fn build_health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "lms-invoicing"
    }))
}
