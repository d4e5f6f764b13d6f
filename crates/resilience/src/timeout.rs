//! Deadline enforcement for a single async operation.

use std::future::Future;
use std::time::Duration;

use crate::error::TimeoutError;

/// Races `operation` against a timer of `duration`.
///
/// Returns the operation's output if it finishes first, otherwise a
/// [`TimeoutError`]. On timeout the operation future is dropped; any work it
/// already handed off (a request on the wire, a spawned task) may still
/// complete, so callers must not assume the side effect did not happen.
/// No retries are performed here.
pub async fn with_timeout<F>(operation: F, duration: Duration) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(duration, operation)
        .await
        .map_err(|_| TimeoutError { duration })
}
