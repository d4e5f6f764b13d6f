//! Tracking service error types.

use carriers::CarrierError;
use common::OrderId;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`crate::TrackingService`].
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A carrier failure that must reach the caller, e.g. rejected credentials
    /// or an open auth circuit.
    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TrackingError {
    /// Seconds until an open circuit admits a probe, if that is the cause.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            TrackingError::Carrier(CarrierError::CircuitOpen(open)) => {
                Some(open.retry_after_secs())
            }
            _ => None,
        }
    }
}

/// Result type for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use resilience::CircuitOpenError;

    use super::*;

    #[test]
    fn test_retry_after_only_for_open_circuit() {
        let open = TrackingError::Carrier(CarrierError::CircuitOpen(CircuitOpenError {
            name: "ppl-auth".to_string(),
            remaining: Duration::from_millis(4_200),
        }));
        assert_eq!(open.retry_after_secs(), Some(5));

        let missing = TrackingError::OrderNotFound(OrderId::new());
        assert_eq!(missing.retry_after_secs(), None);
    }
}
