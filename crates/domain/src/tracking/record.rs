//! Persisted shipment tracking record.

use chrono::{DateTime, Utc};
use common::{CartonId, OrderId, TrackingId};
use serde::{Deserialize, Serialize};

use super::normalized::{Checkpoint, NormalizedTracking};
use super::status::TrackingStatus;

/// Latest known tracking state for one carrier tracking number.
///
/// One record exists per tracking number. Records are only mutated through
/// [`ShipmentTrackingRecord::apply`] and are never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentTrackingRecord {
    pub id: TrackingId,
    pub order_id: OrderId,
    pub carton_id: Option<CartonId>,
    pub carrier: String,
    pub tracking_number: String,
    pub status_code: TrackingStatus,
    pub status_label: String,
    /// Most recent first.
    pub checkpoints: Vec<Checkpoint>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Last fetch error, cleared by the next successful fetch.
    pub error_state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentTrackingRecord {
    /// Creates a never-checked record.
    pub fn new(new: NewTrackingRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: TrackingId::new(),
            order_id: new.order_id,
            carton_id: new.carton_id,
            carrier: new.carrier,
            tracking_number: new.tracking_number,
            status_code: TrackingStatus::Created,
            status_label: TrackingStatus::Created.default_label().to_string(),
            checkpoints: Vec::new(),
            estimated_delivery: None,
            delivered_at: None,
            last_event_at: None,
            last_checked_at: None,
            error_state: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true once the carrier has confirmed delivery.
    pub fn is_delivered(&self) -> bool {
        self.status_code == TrackingStatus::Delivered || self.delivered_at.is_some()
    }

    /// Applies one refresh outcome.
    pub fn apply(&mut self, update: TrackingUpdate) {
        match update {
            TrackingUpdate::Snapshot {
                tracking,
                checked_at,
            } => {
                self.status_code = tracking.status_code();
                self.status_label = tracking.status_label().to_string();
                self.estimated_delivery = tracking.estimated_delivery();
                self.delivered_at = tracking.delivered_at();
                self.last_event_at = tracking.last_event_at();
                self.checkpoints = tracking.into_checkpoints();
                self.error_state = None;
                self.last_checked_at = Some(checked_at);
                self.updated_at = checked_at;
            }
            TrackingUpdate::Failure { error, checked_at } => {
                self.error_state = Some(error);
                self.last_checked_at = Some(checked_at);
                self.updated_at = checked_at;
            }
        }
    }
}

/// Fields needed to start tracking a shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackingRecord {
    pub order_id: OrderId,
    pub carton_id: Option<CartonId>,
    pub carrier: String,
    pub tracking_number: String,
}

/// The single write a refresh attempt makes.
///
/// Every attempt ends in exactly one of these, so `last_checked_at` never
/// advances without either a stored snapshot or a stored error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUpdate {
    /// Carrier answered: replace the snapshot and clear the error.
    Snapshot {
        tracking: NormalizedTracking,
        checked_at: DateTime<Utc>,
    },
    /// Carrier could not be queried: keep the snapshot and record the error.
    Failure {
        error: String,
        checked_at: DateTime<Utc>,
    },
}

impl TrackingUpdate {
    /// Returns when the attempt was made.
    pub fn checked_at(&self) -> DateTime<Utc> {
        match self {
            TrackingUpdate::Snapshot { checked_at, .. } | TrackingUpdate::Failure { checked_at, .. } => {
                *checked_at
            }
        }
    }
}
