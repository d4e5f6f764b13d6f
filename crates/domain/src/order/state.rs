//! Order status machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered ──► Returned
///    │             │            │
///    └─────────────┴────────────┴──► Cancelled
/// ```
///
/// The tracking subsystem only ever performs `Shipped ──► Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order accepted, not yet picked.
    #[default]
    Pending,

    /// Order is being picked and packed.
    Processing,

    /// Handed over to a carrier.
    Shipped,

    /// Every shipment reached the customer.
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,

    /// Goods came back after delivery (terminal state).
    Returned,
}

impl OrderStatus {
    /// Returns true if tracking may advance the order to `Delivered`.
    pub fn can_mark_delivered(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "returned" => Ok(OrderStatus::Returned),
            other => Err(DomainError::UnknownOrderStatus(other.to_string())),
        }
    }
}
