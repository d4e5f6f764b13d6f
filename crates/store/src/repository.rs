use async_trait::async_trait;
use common::{OrderId, TrackingId};
use domain::{
    Carton, NewTrackingRecord, Order, OrderStatus, ShipmentLabel, ShipmentTrackingRecord,
    TrackingStatus, TrackingUpdate,
};

use crate::Result;

/// Outcome of an idempotent tracking insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was created.
    Inserted(ShipmentTrackingRecord),
    /// A record for the tracking number already existed and was left untouched.
    Existing(ShipmentTrackingRecord),
}

impl InsertOutcome {
    /// Returns the stored record.
    pub fn record(&self) -> &ShipmentTrackingRecord {
        match self {
            InsertOutcome::Inserted(record) | InsertOutcome::Existing(record) => record,
        }
    }

    /// Returns true if this call created the record.
    pub fn was_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Storage for shipment tracking records.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait TrackingRepository: Send + Sync {
    /// Loads one record.
    async fn find_by_id(&self, id: TrackingId) -> Result<Option<ShipmentTrackingRecord>>;

    /// Loads every record for an order, oldest first.
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Vec<ShipmentTrackingRecord>>;

    /// Loads every record currently in `status`.
    async fn find_all_with_status(
        &self,
        status: TrackingStatus,
    ) -> Result<Vec<ShipmentTrackingRecord>>;

    /// Inserts a record unless one already exists for the tracking number.
    async fn insert_if_absent(&self, new: NewTrackingRecord) -> Result<InsertOutcome>;

    /// Applies a refresh outcome and returns the stored record.
    ///
    /// Fails with `NotFound` if the record does not exist.
    async fn update(&self, id: TrackingId, update: TrackingUpdate)
    -> Result<ShipmentTrackingRecord>;
}

/// Storage for orders, as far as tracking is concerned.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Loads one order.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>>;

    /// Unconditionally sets an order's status.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Sets the status to `new` only if it is currently `expected`.
    ///
    /// Returns true if this call performed the write. Concurrent callers
    /// racing on the same order see at most one `true`.
    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<bool>;
}

/// Read-only access to shipping labels.
#[async_trait]
pub trait ShipmentLabelRepository: Send + Sync {
    /// Loads an order's labels, oldest first.
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Vec<ShipmentLabel>>;
}

/// Read-only access to cartons.
#[async_trait]
pub trait CartonRepository: Send + Sync {
    /// Loads an order's cartons.
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Vec<Carton>>;
}
