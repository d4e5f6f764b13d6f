//! Carrier-agnostic tracking model and the persisted tracking record.

mod normalized;
mod record;
mod status;

pub use normalized::{Checkpoint, NormalizedTracking};
pub use record::{NewTrackingRecord, ShipmentTrackingRecord, TrackingUpdate};
pub use status::TrackingStatus;
