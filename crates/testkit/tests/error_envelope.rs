//! Integration tests for shared error propagation.

use index_provisioner_shared::{
    ErrorCode, ErrorEnvelope, ErrorKind, OperationFailed, RetryPolicy, retry_fixed,
};
use index_provisioner_testkit::errors::{index_not_found_error, timeout_error, transient_error};
use std::time::Duration;

#[test]
fn error_envelope_crosses_crates() {
    let timeout = timeout_error();
    assert_eq!(timeout.code, ErrorCode::timeout());
    assert!(timeout.is_retriable());

    let boxed: Box<dyn std::error::Error> = Box::new(timeout);
    assert!(boxed.to_string().contains("timeout"));
}

#[test]
fn not_found_fixture_carries_index_metadata() {
    let error = index_not_found_error("docs");
    assert_eq!(error.kind, ErrorKind::Unexpected);
    assert!(!error.is_retriable());
    assert_eq!(error.metadata.get("index").map(String::as_str), Some("docs"));
}

#[tokio::test]
async fn exhausted_retry_converts_to_operation_failed_envelope()
-> Result<(), Box<dyn std::error::Error>> {
    let policy = RetryPolicy::new(2, Duration::ZERO)?;
    let result: Result<(), OperationFailed> =
        retry_fixed(policy, "create_index", || async { Err(transient_error()) }).await;

    let Err(failure) = result else {
        return Err("expected retry to fail".into());
    };
    let envelope = ErrorEnvelope::from(failure);
    assert_eq!(envelope.code, OperationFailed::error_code());
    assert_eq!(envelope.metadata.get("attempts").map(String::as_str), Some("2"));
    Ok(())
}
