//! Domain error types.

use thiserror::Error;

/// Errors that can occur when interpreting domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A persisted tracking status string is not recognised.
    #[error("Unknown tracking status: {0}")]
    UnknownTrackingStatus(String),

    /// A persisted order status string is not recognised.
    #[error("Unknown order status: {0}")]
    UnknownOrderStatus(String),
}
