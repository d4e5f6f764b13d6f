//! Refresh scheduling for tracking records.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Shortest allowed interval between carrier queries for one record.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest allowed interval between carrier queries for one record.
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Decides whether a tracking record is due for a carrier query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    interval: Duration,
}

impl RefreshPolicy {
    /// Creates a policy, clamping `interval` to
    /// [`MIN_REFRESH_INTERVAL`]..=[`MAX_REFRESH_INTERVAL`].
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL),
        }
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A record never checked is always due. A `last_checked_at` in the
    /// future (clock skew) is not due until that instant has passed.
    pub fn is_due(&self, last_checked_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last_checked_at else {
            return true;
        };
        match now.signed_duration_since(last).to_std() {
            Ok(elapsed) => elapsed >= self.interval,
            Err(_) => false,
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from_minutes(60)
    }
}
