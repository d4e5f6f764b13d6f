//! Domain model for the shipment tracking system.
//!
//! This crate provides:
//! - `TrackingStatus`, `Checkpoint` and `NormalizedTracking`, the carrier-agnostic status model
//! - `ShipmentTrackingRecord` and the `TrackingUpdate` writes that mutate it
//! - The slice of the order model this subsystem reads and advances

pub mod error;
pub mod order;
pub mod tracking;

pub use common::{CartonId, LabelId, OrderId, TrackingId};
pub use error::DomainError;
pub use order::{Carton, Order, OrderStatus, ShipmentLabel};
pub use tracking::{
    Checkpoint, NewTrackingRecord, NormalizedTracking, ShipmentTrackingRecord, TrackingStatus,
    TrackingUpdate,
};
