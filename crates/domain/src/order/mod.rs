//! The slice of the order model the tracking subsystem touches.
//!
//! Orders, labels and cartons are owned by other parts of the system. This
//! subsystem reads them and may only move an order from `Shipped` to `Delivered`.

mod state;

pub use state::OrderStatus;

use chrono::{DateTime, Utc};
use common::{CartonId, LabelId, OrderId};
use serde::{Deserialize, Serialize};

/// A customer order as seen by the tracking subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order in the given status.
    pub fn new(id: OrderId, status: OrderStatus) -> Self {
        Self {
            id,
            status,
            updated_at: Utc::now(),
        }
    }
}

/// A shipping label printed for an order.
///
/// The carrier and tracking number are filled in once the carrier accepts
/// the shipment; either may still be missing on a draft label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentLabel {
    pub id: LabelId,
    pub order_id: OrderId,
    pub carton_id: Option<CartonId>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ShipmentLabel {
    /// Creates a label for an order with the given carrier and tracking number.
    pub fn new(
        order_id: OrderId,
        carrier: impl Into<String>,
        tracking_number: impl Into<String>,
    ) -> Self {
        Self {
            id: LabelId::new(),
            order_id,
            carton_id: None,
            carrier: Some(carrier.into()),
            tracking_number: Some(tracking_number.into()),
            created_at: Utc::now(),
        }
    }

    /// Attaches the label to a carton.
    pub fn for_carton(mut self, carton_id: CartonId) -> Self {
        self.carton_id = Some(carton_id);
        self
    }

    /// Returns the carrier name if it is present and not blank.
    pub fn known_carrier(&self) -> Option<&str> {
        self.carrier
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// A packed carton belonging to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carton {
    pub id: CartonId,
    pub order_id: OrderId,
    pub tracking_number: Option<String>,
}

impl Carton {
    /// Creates a carton with an optional carrier tracking number.
    pub fn new(order_id: OrderId, tracking_number: Option<String>) -> Self {
        Self {
            id: CartonId::new(),
            order_id,
            tracking_number,
        }
    }
}
