//! Error taxonomy tests: every failure class keeps enough detail for a
//! user-facing message without re-deriving it.

use indus_equipment_server::dataverse::DataverseError;
use indus_equipment_server::report::ReportError;
use indus_equipment_server::ErrorResponse;

#[test]
fn error_response_structure() {
    let response = ErrorResponse::new("CapabilityUnavailable", "no backend for PDF");
    assert_eq!(response.error, "CapabilityUnavailable");
    assert!(response.message.contains("PDF"));
    assert!(!response.timestamp.is_empty());

    let not_found = ErrorResponse::not_found("Equipment not found");
    assert_eq!(not_found.error, "NotFound");
}

#[test]
fn remote_request_failure_keeps_status_and_body() {
    let err = DataverseError::RequestFailed {
        status: 400,
        body: r#"{"error":{"message":"Invalid GUID"}}"#.into(),
    };
    let text = err.to_string();
    assert!(text.contains("400"));
    assert!(text.contains("Invalid GUID"));
}

#[test]
fn authentication_failure_carries_provider_diagnostics() {
    let err = DataverseError::AuthenticationFailed {
        message: "AADSTS7000215: Invalid client secret provided".into(),
    };
    assert!(err.to_string().contains("AADSTS7000215"));
}

#[test]
fn report_errors_surface_the_originating_record() {
    let err = ReportError::ConversionEnvironmentUnavailable {
        detail: "expected PDF artifact never appeared".into(),
    }
    .for_record("5f2e0a7c-9d41-4b3a-8f06-2e7c1d9b4a55");

    let text = err.to_string();
    assert!(text.contains("5f2e0a7c"));
    assert!(matches!(
        err.root(),
        ReportError::ConversionEnvironmentUnavailable { .. }
    ));
}

#[test]
fn capability_unavailable_names_format_and_strategy() {
    let err = ReportError::CapabilityUnavailable {
        format: "PDF".into(),
        strategy: "local".into(),
    };
    let text = err.to_string();
    assert!(text.contains("PDF"));
    assert!(text.contains("local"));
}
