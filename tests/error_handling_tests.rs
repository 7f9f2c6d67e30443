//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Error conversions work correctly
//! - Ledger operations surface the expected error categories

use axum::http::StatusCode;
use axum::response::IntoResponse;
use lms_invoicing::core::{ConfigError, FieldValidationError, StorageError};
use lms_invoicing::prelude::*;
use rust_decimal_macros::dec;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_missing_invoice_returns_404() {
        let err = BillingError::not_found("invoice", Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_returns_409() {
        let err = BillingError::Entity(EntityError::Conflict {
            entity_type: "invoice".to_string(),
            message: "invoice number INV1001 already exists".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_argument_returns_400() {
        let err = BillingError::invalid_argument("amountPaid", "must be greater than zero");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_field_errors_return_422() {
        let err = BillingError::Validation(ValidationError::FieldErrors(vec![
            FieldValidationError {
                field: "mode".to_string(),
                message: "payment mode is required".to_string(),
            },
        ]));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_storage_error_returns_500() {
        let err = BillingError::Storage(StorageError::ConnectionError {
            backend: "mongodb".to_string(),
            message: "connection refused".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_config_error_returns_500() {
        let err = BillingError::Config(ConfigError::IoError {
            message: "config.yaml: not found".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Response Format Tests
// =============================================================================

mod response_format_tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BillingError::not_found("course", Uuid::nil()).error_code(),
            "ENTITY_NOT_FOUND"
        );
        assert_eq!(
            BillingError::invalid_argument("mode", "blank").error_code(),
            "INVALID_ARGUMENT"
        );
        assert_eq!(
            BillingError::Internal("boom".to_string()).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_not_found_response_includes_details() {
        let id = Uuid::new_v4();
        let response = BillingError::not_found("invoice", id).to_response();

        assert_eq!(response.code, "ENTITY_NOT_FOUND");
        assert!(response.message.contains(&id.to_string()));
        let details = response.details.unwrap();
        assert_eq!(details["entity_type"], "invoice");
        assert_eq!(details["id"], id.to_string());
    }

    #[test]
    fn test_field_errors_listed_in_details() {
        let err = BillingError::Validation(ValidationError::FieldErrors(vec![
            FieldValidationError {
                field: "recipient".to_string(),
                message: "recipient must be an email address".to_string(),
            },
        ]));
        let response = err.to_response();

        let fields = &response.details.unwrap()["fields"];
        assert_eq!(fields[0]["field"], "recipient");
    }

    #[test]
    fn test_internal_error_has_no_details() {
        let response = BillingError::Internal("unexpected".to_string()).to_response();
        assert!(response.details.is_none());
        assert_eq!(
            serde_json::to_value(&response).unwrap().get("details"),
            None
        );
    }
}

// =============================================================================
// Conversion Tests
// =============================================================================

mod conversion_tests {
    use super::*;

    #[test]
    fn test_serde_json_error_is_invalid_json() {
        let err: BillingError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(
            err,
            BillingError::Validation(ValidationError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_uuid_error_is_invalid_uuid() {
        let err: BillingError = Uuid::parse_str("INV1001").unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_UUID");
    }

    #[test]
    fn test_anyhow_error_is_storage_failure() {
        let err: BillingError = anyhow::anyhow!("write timed out").into();
        assert!(matches!(
            err,
            BillingError::Storage(StorageError::OperationFailed { ref message }) if message.contains("timed out")
        ));
    }

    #[test]
    fn test_into_response_status() {
        let response = BillingError::not_found("invoice", Uuid::nil()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = BillingError::invalid_argument("finalFees", "negative").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Ledger operations surface typed errors
// =============================================================================

mod ledger_error_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_invoice_is_not_found() {
        let host = BillingHost::in_memory(AppConfig::default());
        let id = Uuid::new_v4();

        let err = host
            .service
            .add_payment(id, RecordPayment::new(dec!(10), "Cash"))
            .await
            .unwrap_err();
        match err {
            BillingError::Entity(EntityError::NotFound { entity_type, id: missing }) => {
                assert_eq!(entity_type, "invoice");
                assert_eq!(missing, id);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_negative_final_fees_rejected() {
        let host = BillingHost::in_memory(AppConfig::default());
        let course = host
            .courses
            .create(Course::new("Photography", dec!(1500)))
            .await
            .unwrap();

        let err = host
            .service
            .create_invoice(CreateInvoice {
                student_id: Uuid::new_v4(),
                course_id: course.id,
                final_fees: Some(dec!(-1)),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(host.service.list_with_analytics().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_strict_modes_reject_unknown_mode() {
        let mut config = AppConfig::default();
        config.invoicing.strict_payment_modes = true;
        let host = BillingHost::in_memory(config);
        let course = host
            .courses
            .create(Course::new("Music", dec!(800)))
            .await
            .unwrap();
        let invoice = host
            .service
            .create_invoice(CreateInvoice {
                student_id: Uuid::new_v4(),
                course_id: course.id,
                final_fees: None,
            })
            .await
            .unwrap();

        let err = host
            .service
            .add_payment(invoice.id, RecordPayment::new(dec!(100), "Crypto"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Crypto"));

        host.service
            .add_payment(invoice.id, RecordPayment::new(dec!(100), "Bank Transfer"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_student_rejected_when_verified() {
        let mut config = AppConfig::default();
        config.invoicing.verify_student_exists = true;
        let host = BillingHost::in_memory(config);
        let course = host
            .courses
            .create(Course::new("Chemistry", dec!(900)))
            .await
            .unwrap();

        let err = host
            .service
            .create_invoice(CreateInvoice {
                student_id: Uuid::new_v4(),
                course_id: course.id,
                final_fees: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BillingError::Entity(EntityError::NotFound { ref entity_type, .. }) if entity_type == "student"
        ));
    }
}
