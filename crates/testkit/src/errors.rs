//! Test fixtures for shared error codes and envelopes.

use index_provisioner_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::not_found(),
        ErrorCode::timeout(),
        ErrorCode::unavailable(),
        ErrorCode::io(),
        ErrorCode::internal(),
    ]
}

/// A transient control API failure (retriable).
pub fn transient_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::unavailable(),
        "HTTP 503: service unavailable",
        ErrorClass::Retriable,
    )
}

/// An index-not-found failure, as reported by `describe`.
pub fn index_not_found_error(index: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("controller", "index_not_found"),
        format!("HTTP 404: index `{index}` not found"),
        ErrorClass::NonRetriable,
    )
    .with_metadata("index", index.to_owned())
}

/// An invalid input error fixture.
pub fn invalid_input_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid input")
}

/// A retriable timeout error fixture.
pub fn timeout_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::timeout(), "timeout", ErrorClass::Retriable)
}
