//! Persistence seam for the tracking subsystem.
//!
//! The real stores live elsewhere; this crate defines the repository traits
//! the tracking core consumes and in-memory implementations for tests and
//! the reference binary.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{
    InMemoryCartonRepository, InMemoryOrderRepository, InMemoryShipmentLabelRepository,
    InMemoryTrackingRepository,
};
pub use repository::{
    CartonRepository, InsertOutcome, OrderRepository, ShipmentLabelRepository, TrackingRepository,
};
