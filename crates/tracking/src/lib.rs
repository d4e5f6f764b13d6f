//! Tracking orchestration.
//!
//! [`TrackingService`] decides when a shipment's carrier is queried, writes
//! each attempt back as exactly one [`domain::TrackingUpdate`], and moves
//! orders from `shipped` to `delivered` once every parcel has arrived.

pub mod config;
pub mod error;
pub mod outcome;
pub mod service;

pub use config::TrackingConfig;
pub use error::{Result, TrackingError};
pub use outcome::{RefreshKind, RefreshOutcome, SweepSummary};
pub use service::TrackingService;
