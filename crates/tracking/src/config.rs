//! Tracking service configuration.

/// Default number of records refreshed concurrently by a sweep.
pub const DEFAULT_SWEEP_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Upper bound on concurrent carrier queries during [`refresh_due`].
    ///
    /// [`refresh_due`]: crate::TrackingService::refresh_due
    pub sweep_concurrency: usize,
}

impl TrackingConfig {
    pub fn new(sweep_concurrency: usize) -> Self {
        Self {
            sweep_concurrency: sweep_concurrency.max(1),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_is_at_least_one() {
        assert_eq!(TrackingConfig::new(0).sweep_concurrency, 1);
        assert_eq!(TrackingConfig::default().sweep_concurrency, 8);
    }
}
