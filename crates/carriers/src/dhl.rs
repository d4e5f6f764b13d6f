//! DHL unified shipment tracking adapter. Authenticates with a static API key.

use async_trait::async_trait;
use domain::{Checkpoint, NormalizedTracking};
use serde::Deserialize;

use crate::adapter::{TrackingAdapter, absorb};
use crate::error::CarrierError;
use crate::http::{CarrierHttp, Reply, status_outcome};
use crate::phrases::{self, PhraseTable};
use crate::policy::RefreshPolicy;
use crate::timestamp;

pub const DHL_CARRIER: &str = "DHL";

const API_KEY_HEADER: &str = "DHL-API-Key";

const TABLES: &[PhraseTable] = &[phrases::GERMAN, phrases::ENGLISH];

#[derive(Debug, Deserialize)]
struct DhlResponse {
    #[serde(default)]
    shipments: Vec<DhlShipment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhlShipment {
    status: Option<DhlEvent>,
    estimated_time_of_delivery: Option<String>,
    #[serde(default)]
    events: Vec<DhlEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhlEvent {
    timestamp: Option<String>,
    location: Option<DhlLocation>,
    status_code: Option<String>,
    status: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DhlLocation {
    address: Option<DhlAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhlAddress {
    address_locality: Option<String>,
}

impl DhlEvent {
    fn text(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or(self.description.as_deref())
            .or(self.status_code.as_deref())
    }

    fn locality(&self) -> Option<&str> {
        self.location
            .as_ref()?
            .address
            .as_ref()?
            .address_locality
            .as_deref()
            .filter(|l| !l.trim().is_empty())
    }
}

pub struct DhlAdapter {
    http: CarrierHttp,
    base_url: String,
    api_key: Option<String>,
    policy: RefreshPolicy,
}

impl DhlAdapter {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        http: CarrierHttp,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            policy,
        }
    }

    async fn query(&self, tracking_number: &str) -> Result<NormalizedTracking, CarrierError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(NormalizedTracking::degraded(
                "DHL API key is not configured, check carrier configuration",
            ));
        };
        let request = self
            .http
            .client()
            .get(&self.base_url)
            .query(&[("trackingNumber", tracking_number)])
            .header(API_KEY_HEADER, api_key);

        match self.http.get_json::<DhlResponse>(DHL_CARRIER, request).await? {
            Reply::Body(body) => Ok(normalize(body)),
            Reply::Status(status) => status_outcome(DHL_CARRIER, status),
        }
    }
}

#[async_trait]
impl TrackingAdapter for DhlAdapter {
    fn carrier(&self) -> &str {
        DHL_CARRIER
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self), fields(carrier = DHL_CARRIER))]
    async fn fetch_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<NormalizedTracking, CarrierError> {
        absorb(DHL_CARRIER, tracking_number, self.query(tracking_number).await)
    }
}

fn normalize(body: DhlResponse) -> NormalizedTracking {
    let Some(shipment) = body.shipments.into_iter().next() else {
        return NormalizedTracking::not_yet_ingested();
    };
    let current = shipment.status.unwrap_or_default();

    let checkpoints: Vec<Checkpoint> = shipment
        .events
        .iter()
        .filter_map(|event| {
            let timestamp = timestamp::parse_field(DHL_CARRIER, event.timestamp.as_deref())?;
            let text = event.text()?;
            let mut checkpoint = Checkpoint::new(timestamp, text);
            if let Some(locality) = event.locality() {
                checkpoint = checkpoint.at(locality);
            }
            if let Some(description) = event.description.as_deref()
                && description != text
            {
                checkpoint = checkpoint.described(description);
            }
            Some(checkpoint)
        })
        .collect();

    let newest = checkpoints
        .iter()
        .max_by_key(|c| c.timestamp)
        .map(|c| c.status_text.clone());

    if current.text().is_none() && newest.is_none() {
        return NormalizedTracking::not_yet_ingested();
    }

    let status = phrases::classify(
        phrases::DHL_CODES,
        current.status_code.as_deref(),
        TABLES,
        [
            current.status.as_deref(),
            current.description.as_deref(),
            newest.as_deref(),
        ]
        .into_iter()
        .flatten(),
    );
    let label = current
        .text()
        .map(str::to_string)
        .or(newest)
        .unwrap_or_else(|| status.default_label().to_string());
    let estimated =
        timestamp::parse_field(DHL_CARRIER, shipment.estimated_time_of_delivery.as_deref());

    NormalizedTracking::new(status, label, checkpoints, estimated)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use domain::TrackingStatus;

    use super::*;

    fn parse(json: &str) -> DhlResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_in_transit_shipment() {
        let body = parse(
            r#"{"shipments": [{
                "status": {"statusCode": "transit", "status": "Arrived at Delivery Facility", "timestamp": "2024-03-14T06:10:00Z"},
                "estimatedTimeOfDelivery": "2024-03-15T18:00:00Z",
                "events": [
                    {"timestamp": "2024-03-12T20:00:00Z", "location": {"address": {"addressLocality": "Leipzig"}}, "statusCode": "transit", "status": "Processed"},
                    {"timestamp": "2024-03-14T06:10:00Z", "location": {"address": {"addressLocality": "Praha"}}, "statusCode": "transit", "status": "Arrived at Delivery Facility", "description": "Arrived at DHL facility in PRAHA"}
                ]
            }]}"#,
        );

        let tracking = normalize(body);
        assert_eq!(tracking.status_code(), TrackingStatus::InTransit);
        assert_eq!(tracking.status_label(), "Arrived at Delivery Facility");
        assert_eq!(
            tracking.estimated_delivery(),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap())
        );
        let newest = &tracking.checkpoints()[0];
        assert_eq!(newest.location.as_deref(), Some("Praha"));
        assert_eq!(newest.description.as_deref(), Some("Arrived at DHL facility in PRAHA"));
        assert_eq!(tracking.delivered_at(), None);
    }

    #[test]
    fn test_german_delivered() {
        let body = parse(
            r#"{"shipments": [{
                "status": {"statusCode": "unknown", "status": "Die Sendung wurde zugestellt"},
                "events": [{"timestamp": "2024-03-14T12:00:00+01:00", "status": "Die Sendung wurde zugestellt"}]
            }]}"#,
        );
        let tracking = normalize(body);
        assert_eq!(tracking.status_code(), TrackingStatus::Delivered);
        assert_eq!(
            tracking.delivered_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 11, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_failure_code_is_exception() {
        let body = parse(
            r#"{"shipments": [{"status": {"statusCode": "failure", "status": "Delivery attempt unsuccessful"}}]}"#,
        );
        assert_eq!(normalize(body).status_code(), TrackingStatus::Exception);
    }

    #[test]
    fn test_negated_english_text_is_not_delivered() {
        let body = parse(
            r#"{"shipments": [{"status": {"statusCode": "unknown", "status": "Shipment not delivered - recipient absent"}}]}"#,
        );
        let tracking = normalize(body);
        assert_eq!(tracking.status_code(), TrackingStatus::Exception);
        assert_eq!(tracking.delivered_at(), None);

        let body = parse(
            r#"{"shipments": [{"status": {"status": "Undeliverable address"}}]}"#,
        );
        assert_eq!(normalize(body).status_code(), TrackingStatus::Exception);
    }

    #[test]
    fn test_empty_shipments_is_not_yet_ingested() {
        let tracking = normalize(parse(r#"{"shipments": []}"#));
        assert_eq!(tracking.status_code(), TrackingStatus::Created);
        assert!(tracking.checkpoints().is_empty());
    }
}
