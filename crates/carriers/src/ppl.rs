//! PPL (DHL eCommerce CZ) adapter.
//!
//! PPL authenticates with an OAuth2 bearer token. Token acquisition runs
//! through the `ppl-auth` circuit breaker, so a broken credential stops
//! hammering the token endpoint after a few attempts.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{Checkpoint, NormalizedTracking};
use reqwest::StatusCode;
use resilience::CircuitBreaker;
use serde::Deserialize;

use crate::adapter::{TrackingAdapter, absorb, join_location};
use crate::error::CarrierError;
use crate::http::{CarrierHttp, Reply, status_outcome};
use crate::phrases::{self, PhraseTable};
use crate::policy::RefreshPolicy;
use crate::timestamp;
use crate::token::TokenProvider;

pub const PPL_CARRIER: &str = "PPL";

/// Name of the breaker guarding PPL token acquisition.
pub const PPL_AUTH_BREAKER: &str = "ppl-auth";

const TABLES: &[PhraseTable] = &[phrases::CZECH, phrases::ENGLISH];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PplShipment {
    shipment_number: Option<String>,
    track_and_trace: Option<PplTrackAndTrace>,
    estimated_delivery_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PplTrackAndTrace {
    last_event_name: Option<String>,
    #[serde(default)]
    events: Vec<PplEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PplEvent {
    event_date: Option<String>,
    code: Option<String>,
    name: Option<String>,
    post_code: Option<String>,
    city: Option<String>,
}

pub struct PplAdapter {
    http: CarrierHttp,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    auth_breaker: Arc<CircuitBreaker>,
    policy: RefreshPolicy,
}

impl PplAdapter {
    pub fn new(
        base_url: impl Into<String>,
        http: CarrierHttp,
        tokens: Arc<dyn TokenProvider>,
        auth_breaker: Arc<CircuitBreaker>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens,
            auth_breaker,
            policy,
        }
    }

    async fn access_token(&self) -> Result<String, CarrierError> {
        self.auth_breaker
            .execute(|| self.tokens.get_access_token(PPL_CARRIER))
            .await
            .map_err(|e| CarrierError::from_token_call(PPL_CARRIER, e))
    }

    async fn query(&self, tracking_number: &str) -> Result<NormalizedTracking, CarrierError> {
        let token = self.access_token().await?;
        let url = format!("{}/shipment", self.base_url.trim_end_matches('/'));
        let request = self
            .http
            .client()
            .get(url)
            .query(&[("ShipmentNumbers", tracking_number)])
            .bearer_auth(token);

        match self.http.get_json::<Vec<PplShipment>>(PPL_CARRIER, request).await? {
            Reply::Body(shipments) => Ok(normalize(tracking_number, shipments)),
            Reply::Status(status) => {
                if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                    self.tokens.invalidate(PPL_CARRIER).await;
                }
                status_outcome(PPL_CARRIER, status)
            }
        }
    }
}

#[async_trait]
impl TrackingAdapter for PplAdapter {
    fn carrier(&self) -> &str {
        PPL_CARRIER
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self), fields(carrier = PPL_CARRIER))]
    async fn fetch_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<NormalizedTracking, CarrierError> {
        absorb(PPL_CARRIER, tracking_number, self.query(tracking_number).await)
    }
}

fn normalize(tracking_number: &str, mut shipments: Vec<PplShipment>) -> NormalizedTracking {
    if shipments.is_empty() {
        return NormalizedTracking::not_yet_ingested();
    }
    let index = shipments
        .iter()
        .position(|s| s.shipment_number.as_deref() == Some(tracking_number))
        .unwrap_or(0);
    let shipment = shipments.swap_remove(index);
    let trace = shipment.track_and_trace.unwrap_or_default();

    let checkpoints: Vec<Checkpoint> = trace
        .events
        .iter()
        .filter_map(|event| {
            let timestamp = timestamp::parse_field(PPL_CARRIER, event.event_date.as_deref())?;
            let text = event.name.as_deref().or(event.code.as_deref())?;
            let checkpoint = Checkpoint::new(timestamp, text);
            Some(
                match join_location([event.city.as_deref(), event.post_code.as_deref()]) {
                    Some(location) => checkpoint.at(location),
                    None => checkpoint,
                },
            )
        })
        .collect();

    let newest = checkpoints
        .iter()
        .max_by_key(|c| c.timestamp)
        .map(|c| c.status_text.clone());
    let Some(label) = newest.or(trace.last_event_name) else {
        return NormalizedTracking::not_yet_ingested();
    };

    let status = phrases::match_status(TABLES, &label);
    let estimated = timestamp::parse_field(PPL_CARRIER, shipment.estimated_delivery_date.as_deref());
    NormalizedTracking::new(status, label, checkpoints, estimated)
}
