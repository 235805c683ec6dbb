//! Tests for domain error construction and formatting.

use super::*;
use rstest::rstest;

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "bad");
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
#[should_panic(expected = "error messages must satisfy validation")]
fn new_panics_on_blank_message() {
    let _ = Error::new(ErrorCode::InternalError, "");
}

#[rstest]
#[case::invalid(Error::invalid_request("x"), "invalid_request")]
#[case::unavailable(Error::service_unavailable("x"), "service_unavailable")]
#[case::internal(Error::internal("x"), "internal_error")]
fn codes_render_snake_case_labels(#[case] error: Error, #[case] expected: &str) {
    assert_eq!(error.code().as_str(), expected);
}

#[rstest]
fn display_uses_message() {
    let err = Error::service_unavailable("accrual service down");
    assert_eq!(err.to_string(), "accrual service down");
}
