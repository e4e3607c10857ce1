//! Fixed-delay retry executor for remote operations.
//!
//! Every failure is retried until the attempt budget is spent, regardless of
//! its [`crate::ErrorClass`]. The last failure is wrapped in
//! [`OperationFailed`] together with the number of attempts made.

use crate::{BoundedU32, ErrorClass, ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Default attempt budget for remote operations.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retry policy: attempt budget (at least one) and a fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Build a policy, rejecting a zero attempt budget.
    pub fn new(attempts: u32, delay: Duration) -> Result<Self> {
        if attempts == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "retry policy requires at least one attempt",
            )
            .with_metadata("attempts", "0"));
        }
        Ok(Self { attempts, delay })
    }

    /// Build a policy from an attempt count already proven to be at least one.
    #[must_use]
    pub const fn from_bounded<const MAX: u32>(attempts: BoundedU32<1, MAX>, delay: Duration) -> Self {
        Self {
            attempts: attempts.get(),
            delay,
        }
    }

    /// Policy that runs the operation once.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Maximum attempts, including the first try.
    #[must_use]
    pub const fn attempts(self) -> u32 {
        self.attempts
    }

    /// Delay applied between attempts.
    #[must_use]
    pub const fn delay(self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// A single failed attempt, handed to retry observers.
#[derive(Debug, Clone, Copy)]
pub struct AttemptFailure<'a> {
    /// Operation name.
    pub operation: &'a str,
    /// 1-based attempt number that failed.
    pub attempt: u32,
    /// Attempt budget.
    pub attempts: u32,
    /// Failure returned by the attempt.
    pub error: &'a ErrorEnvelope,
    /// Delay before the next attempt; `None` when the budget is spent.
    pub retry_in: Option<Duration>,
}

/// Returned when an operation exhausts its retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailed {
    /// Name of the operation that failed.
    pub operation_name: Box<str>,
    /// Failure from the final attempt.
    pub cause: ErrorEnvelope,
    /// Attempts made.
    pub attempts: u32,
}

impl OperationFailed {
    /// Stable code for exhausted retries.
    pub fn error_code() -> ErrorCode {
        ErrorCode::new("retry", "operation_failed")
    }
}

impl fmt::Display for OperationFailed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "failed to run operation: {} after {} attempt(s): {}",
            self.operation_name, self.attempts, self.cause.message
        )
    }
}

impl std::error::Error for OperationFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl From<OperationFailed> for ErrorEnvelope {
    fn from(error: OperationFailed) -> Self {
        let message = error.to_string();
        let mut envelope =
            Self::unexpected(OperationFailed::error_code(), message, ErrorClass::NonRetriable)
            .with_metadata("operation", error.operation_name.as_ref())
            .with_metadata("attempts", error.attempts.to_string())
            .with_metadata("causeCode", error.cause.code.to_string());
        for (key, value) in error.cause.metadata {
            envelope.metadata.entry(key).or_insert(value);
        }
        envelope
    }
}

/// Run `op` under `policy` without observing individual failures.
pub async fn retry_fixed<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    op: F,
) -> Result<T, OperationFailed>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_fixed_with_observer(policy, operation, op, |_| {}).await
}

/// Run `op` under `policy`, invoking `on_failure` once per failed attempt.
pub async fn retry_fixed_with_observer<T, F, Fut, Obs>(
    policy: RetryPolicy,
    operation: &str,
    mut op: F,
    mut on_failure: Obs,
) -> Result<T, OperationFailed>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    Obs: FnMut(AttemptFailure<'_>),
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let exhausted = attempt >= attempts;
                on_failure(AttemptFailure {
                    operation,
                    attempt,
                    attempts,
                    error: &error,
                    retry_in: (!exhausted).then_some(policy.delay),
                });
                if exhausted {
                    return Err(OperationFailed {
                        operation_name: operation.into(),
                        cause: error,
                        attempts: attempt,
                    });
                }
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            },
        }
    }
}
