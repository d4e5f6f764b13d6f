//! The adapter contract and carrier dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::NormalizedTracking;

use crate::error::CarrierError;
use crate::policy::RefreshPolicy;

/// Queries one carrier and maps its answer onto the shared status model.
///
/// Adapters are stateless with respect to tracking records: they never
/// persist and may be shared between any number of concurrent refreshes.
#[async_trait]
pub trait TrackingAdapter: Send + Sync {
    /// Carrier name used in logs and metric labels.
    fn carrier(&self) -> &str;

    fn refresh_policy(&self) -> RefreshPolicy;

    /// Fetches and normalizes tracking for `tracking_number`.
    ///
    /// Carrier-side failures come back as `Ok` with a degraded `unknown`
    /// result. Only errors for which [`CarrierError::propagates`] holds are
    /// returned as `Err`.
    async fn fetch_tracking(&self, tracking_number: &str)
    -> Result<NormalizedTracking, CarrierError>;

    /// Returns true if a record last checked at `last_checked_at` is due.
    fn should_refresh(&self, last_checked_at: Option<DateTime<Utc>>) -> bool {
        self.refresh_policy().is_due(last_checked_at, Utc::now())
    }
}

/// Selects the adapter for a carrier name. Total: unknown names get a
/// generic adapter.
pub trait AdapterResolver: Send + Sync {
    fn resolve(&self, carrier: &str) -> Arc<dyn TrackingAdapter>;
}

/// Converts non-propagating failures into a degraded result.
pub(crate) fn absorb(
    carrier: &str,
    tracking_number: &str,
    result: Result<NormalizedTracking, CarrierError>,
) -> Result<NormalizedTracking, CarrierError> {
    match result {
        Err(err) if !err.propagates() => {
            tracing::warn!(
                carrier,
                tracking_number,
                error = %err,
                "Carrier query failed, returning degraded result"
            );
            metrics::counter!("carrier_degraded_total", "carrier" => carrier.to_string())
                .increment(1);
            Ok(NormalizedTracking::degraded(err.to_string()))
        }
        Ok(tracking) if tracking.is_degraded() => {
            tracing::warn!(
                carrier,
                tracking_number,
                reason = tracking.degraded_reason(),
                "Carrier query degraded"
            );
            metrics::counter!("carrier_degraded_total", "carrier" => carrier.to_string())
                .increment(1);
            Ok(tracking)
        }
        other => other,
    }
}

/// Joins the non-blank parts of a location with `", "`.
pub(crate) fn join_location<'a, I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let parts: Vec<&str> = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
