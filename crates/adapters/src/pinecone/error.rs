//! Control API error mapping helpers.

use index_provisioner_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Stable provider identifier used in error metadata.
pub const PINECONE_PROVIDER_ID: &str = "pinecone_controller";

#[derive(Debug, Clone)]
/// Context payload attached to control API error envelopes.
pub struct ControlErrorContext {
    /// Operation label for tracing failures.
    pub operation: &'static str,
    /// Index name, when the request is index-scoped.
    pub index_name: Option<String>,
    /// Request path, when available.
    pub endpoint: Option<String>,
}

impl ControlErrorContext {
    fn annotate(&self, envelope: ErrorEnvelope) -> ErrorEnvelope {
        let mut envelope = envelope
            .with_metadata("provider", PINECONE_PROVIDER_ID)
            .with_metadata("operation", self.operation);
        if let Some(index) = self.index_name.as_ref() {
            envelope = envelope.with_metadata("index", index.to_owned());
        }
        if let Some(endpoint) = self.endpoint.as_ref() {
            envelope = envelope.with_metadata("endpoint", endpoint.to_owned());
        }
        envelope
    }
}

/// Maps a non-success HTTP response into a shared envelope.
pub fn map_http_error(
    message: impl Into<String>,
    http_status: u16,
    ctx: &ControlErrorContext,
) -> ErrorEnvelope {
    let message = message.into();
    let code = choose_code(&message, http_status);
    let class = match code.code() {
        "index_timeout" | "index_connection" | "rate_limited" | "server_error" => {
            ErrorClass::Retriable
        },
        _ => ErrorClass::NonRetriable,
    };

    ctx.annotate(ErrorEnvelope::unexpected(code, message, class))
        .with_metadata("http_status", http_status.to_string())
}

#[cfg(feature = "pinecone")]
/// Maps reqwest transport errors into shared error envelopes.
pub fn map_transport_error(error: &reqwest::Error, ctx: &ControlErrorContext) -> ErrorEnvelope {
    let envelope = if error.is_timeout() {
        ErrorEnvelope::unexpected(
            timeout_code(),
            format!("control API request timed out: {error}"),
            ErrorClass::Retriable,
        )
    } else if error.is_connect() {
        ErrorEnvelope::unexpected(
            connection_code(),
            format!("control API connection failed: {error}"),
            ErrorClass::Retriable,
        )
    } else {
        ErrorEnvelope::unexpected(
            unknown_code(),
            format!("control API request failed: {error}"),
            ErrorClass::NonRetriable,
        )
    };
    ctx.annotate(envelope)
}

/// Error for a request that outlived the client-side deadline.
pub fn deadline_error(ctx: &ControlErrorContext) -> ErrorEnvelope {
    ctx.annotate(ErrorEnvelope::unexpected(
        timeout_code(),
        format!("{} timed out", ctx.operation),
        ErrorClass::Retriable,
    ))
}

/// Error for a response body that does not match the expected shape.
pub fn invalid_response_error(
    detail: impl std::fmt::Display,
    ctx: &ControlErrorContext,
) -> ErrorEnvelope {
    ctx.annotate(ErrorEnvelope::unexpected(
        ErrorCode::new("controller", "invalid_response"),
        format!("invalid control API response: {detail}"),
        ErrorClass::NonRetriable,
    ))
}

fn choose_code(message: &str, http_status: u16) -> ErrorCode {
    match http_status {
        401 | 403 => return auth_code(),
        404 => return not_found_code(),
        408 | 504 => return timeout_code(),
        409 => return ErrorCode::new("controller", "index_conflict"),
        429 => return ErrorCode::new("controller", "rate_limited"),
        500..=599 => return ErrorCode::new("controller", "server_error"),
        _ => {},
    }

    let lowered = message.to_ascii_lowercase();
    if lowered.contains("quota") {
        return ErrorCode::new("controller", "quota_exceeded");
    }
    if lowered.contains("already exists") {
        return ErrorCode::new("controller", "index_conflict");
    }
    if http_status == 400 {
        return ErrorCode::new("controller", "invalid_request");
    }
    unknown_code()
}

/// Code returned when an index does not exist.
#[must_use]
pub fn not_found_code() -> ErrorCode {
    ErrorCode::new("controller", "index_not_found")
}

fn auth_code() -> ErrorCode {
    ErrorCode::new("controller", "auth")
}

fn timeout_code() -> ErrorCode {
    ErrorCode::new("controller", "index_timeout")
}

fn connection_code() -> ErrorCode {
    ErrorCode::new("controller", "index_connection")
}

fn unknown_code() -> ErrorCode {
    ErrorCode::new("controller", "unknown")
}
