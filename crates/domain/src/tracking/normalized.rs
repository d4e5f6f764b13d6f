//! Carrier-agnostic tracking result produced by adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::TrackingStatus;

/// One carrier-reported tracking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub status_text: String,
    pub description: Option<String>,
}

impl Checkpoint {
    /// Creates a checkpoint with no location or description.
    pub fn new(timestamp: DateTime<Utc>, status_text: impl Into<String>) -> Self {
        Self {
            timestamp,
            location: None,
            status_text: status_text.into(),
            description: None,
        }
    }

    /// Sets the location.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the description.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A carrier response mapped onto the shared status model.
///
/// Construction always goes through [`NormalizedTracking::new`] (or one of
/// the fixed-outcome constructors), which orders checkpoints most-recent-first
/// and derives `last_event_at` / `delivered_at` from them. Adapters therefore
/// cannot hand out checkpoints in carrier order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedTracking {
    status_code: TrackingStatus,
    status_label: String,
    checkpoints: Vec<Checkpoint>,
    estimated_delivery: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    last_event_at: Option<DateTime<Utc>>,
    degraded: Option<String>,
}

impl NormalizedTracking {
    /// Builds a result from checkpoints in any order.
    pub fn new(
        status_code: TrackingStatus,
        status_label: impl Into<String>,
        mut checkpoints: Vec<Checkpoint>,
        estimated_delivery: Option<DateTime<Utc>>,
    ) -> Self {
        // Stable, so same-instant events keep the carrier's relative order.
        checkpoints.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let last_event_at = checkpoints.first().map(|c| c.timestamp);
        let delivered_at = if status_code == TrackingStatus::Delivered {
            last_event_at
        } else {
            None
        };
        Self {
            status_code,
            status_label: status_label.into(),
            checkpoints,
            estimated_delivery,
            delivered_at,
            last_event_at,
            degraded: None,
        }
    }

    /// The carrier does not know the parcel yet (label printed, not scanned).
    pub fn not_yet_ingested() -> Self {
        Self::new(
            TrackingStatus::Created,
            "Label created, awaiting carrier pickup",
            Vec::new(),
            None,
        )
    }

    /// The carrier could not be queried; `reason` describes why.
    ///
    /// A degraded result carries no tracking data and must not replace a
    /// previously stored snapshot.
    pub fn degraded(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut tracking = Self::new(TrackingStatus::Unknown, reason.clone(), Vec::new(), None);
        tracking.degraded = Some(reason);
        tracking
    }

    pub fn status_code(&self) -> TrackingStatus {
        self.status_code
    }

    pub fn status_label(&self) -> &str {
        &self.status_label
    }

    /// Checkpoints, most recent first.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at
    }

    /// Why the carrier could not be queried, for degraded results.
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Consumes the result, returning the ordered checkpoints.
    pub fn into_checkpoints(self) -> Vec<Checkpoint> {
        self.checkpoints
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_checkpoints_reordered_most_recent_first() {
        let tracking = NormalizedTracking::new(
            TrackingStatus::InTransit,
            "In transit",
            vec![
                Checkpoint::new(at(8), "Picked up"),
                Checkpoint::new(at(14), "In hub"),
                Checkpoint::new(at(11), "Departed"),
            ],
            None,
        );
        let texts: Vec<_> = tracking
            .checkpoints()
            .iter()
            .map(|c| c.status_text.as_str())
            .collect();
        assert_eq!(texts, vec!["In hub", "Departed", "Picked up"]);
        assert_eq!(tracking.last_event_at(), Some(at(14)));
        assert_eq!(tracking.delivered_at(), None);
    }

    #[test]
    fn test_delivered_at_is_newest_checkpoint() {
        let tracking = NormalizedTracking::new(
            TrackingStatus::Delivered,
            "Delivered",
            vec![
                Checkpoint::new(at(16), "Delivered").at("Brno"),
                Checkpoint::new(at(9), "Out for delivery"),
            ],
            Some(at(18)),
        );
        assert_eq!(tracking.delivered_at(), Some(at(16)));
        assert_eq!(tracking.estimated_delivery(), Some(at(18)));
    }

    #[test]
    fn test_delivered_without_checkpoints_has_no_timestamp() {
        let tracking = NormalizedTracking::new(TrackingStatus::Delivered, "Delivered", vec![], None);
        assert_eq!(tracking.delivered_at(), None);
        assert_eq!(tracking.last_event_at(), None);
    }

    #[test]
    fn test_not_yet_ingested() {
        let tracking = NormalizedTracking::not_yet_ingested();
        assert_eq!(tracking.status_code(), TrackingStatus::Created);
        assert!(tracking.checkpoints().is_empty());
        assert!(!tracking.is_degraded());
    }

    #[test]
    fn test_degraded() {
        let tracking = NormalizedTracking::degraded("Rate limited by carrier");
        assert_eq!(tracking.status_code(), TrackingStatus::Unknown);
        assert_eq!(tracking.status_label(), "Rate limited by carrier");
        assert_eq!(tracking.degraded_reason(), Some("Rate limited by carrier"));
    }
}
