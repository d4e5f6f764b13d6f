//! Resilience error types.

use std::time::Duration;

use thiserror::Error;

/// An operation did not complete before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {}ms", .duration.as_millis())]
pub struct TimeoutError {
    /// The deadline that was exceeded.
    pub duration: Duration,
}

/// A call was rejected because the dependency's breaker is open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit breaker '{name}' is open, retry after {}s", self.retry_after_secs())]
pub struct CircuitOpenError {
    /// Name of the isolated dependency.
    pub name: String,
    /// Cool-down left before the breaker admits a probe.
    pub remaining: Duration,
}

impl CircuitOpenError {
    /// Remaining cool-down rounded up to whole seconds.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Outcome of a breaker-guarded call that did not succeed.
///
/// The caller's own error type is preserved in [`ExecuteError::Failed`].
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The breaker rejected the call without touching the dependency.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The call exceeded the breaker's request timeout.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// The call itself failed.
    #[error("{0}")]
    Failed(E),
}

impl<E> ExecuteError<E> {
    /// Returns the wrapped operation error, if the call reached the dependency and failed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            ExecuteError::Failed(e) => Some(e),
            _ => None,
        }
    }
}
