//! Results returned by the tracking service.

use domain::ShipmentTrackingRecord;
use serde::Serialize;

/// What a single refresh attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshKind {
    /// The carrier answered and a new snapshot was stored.
    Fetched,
    /// The carrier could not be queried; the error was stored, data kept.
    Degraded,
    /// Already delivered; the carrier was not called.
    AlreadyDelivered,
    /// Checked too recently; nothing was written.
    NotDue,
}

/// The record after a refresh, plus whether its order changed status.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub record: ShipmentTrackingRecord,
    pub order_updated: bool,
    pub kind: RefreshKind,
}

/// Totals for one [`refresh_due`](crate::TrackingService::refresh_due) sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Records considered (every record not yet `delivered`).
    pub examined: usize,
    /// New snapshots stored.
    pub refreshed: usize,
    /// Not due, or already delivered.
    pub skipped: usize,
    /// Degraded results plus propagated errors.
    pub failed: usize,
    /// Orders moved to `delivered`.
    pub orders_updated: usize,
}

impl SweepSummary {
    pub(crate) fn record(&mut self, outcome: Option<&RefreshOutcome>) {
        match outcome {
            Some(outcome) => {
                match outcome.kind {
                    RefreshKind::Fetched => self.refreshed += 1,
                    RefreshKind::Degraded => self.failed += 1,
                    RefreshKind::AlreadyDelivered | RefreshKind::NotDue => self.skipped += 1,
                }
                if outcome.order_updated {
                    self.orders_updated += 1;
                }
            }
            None => self.failed += 1,
        }
    }
}
