//! Fallback for carriers without an integration.

use async_trait::async_trait;
use domain::{NormalizedTracking, TrackingStatus};

use crate::adapter::TrackingAdapter;
use crate::error::CarrierError;
use crate::policy::RefreshPolicy;

pub const MANUAL_TRACKING_LABEL: &str = "Manual tracking required";

/// Answers `unknown` for every parcel without touching the network.
#[derive(Debug, Clone)]
pub struct GenericAdapter {
    carrier: String,
    policy: RefreshPolicy,
}

impl GenericAdapter {
    pub fn new(carrier: impl Into<String>, policy: RefreshPolicy) -> Self {
        Self {
            carrier: carrier.into(),
            policy,
        }
    }
}

#[async_trait]
impl TrackingAdapter for GenericAdapter {
    fn carrier(&self) -> &str {
        &self.carrier
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    async fn fetch_tracking(
        &self,
        _tracking_number: &str,
    ) -> Result<NormalizedTracking, CarrierError> {
        Ok(NormalizedTracking::new(
            TrackingStatus::Unknown,
            MANUAL_TRACKING_LABEL,
            Vec::new(),
            None,
        ))
    }
}
