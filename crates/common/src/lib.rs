//! Shared identifier types for the shipment tracking system.

pub mod types;

pub use types::{CartonId, LabelId, OrderId, TrackingId};
