//! GLS adapter. Unauthenticated public track-and-trace endpoint.

use async_trait::async_trait;
use domain::{Checkpoint, NormalizedTracking};
use serde::Deserialize;

use crate::adapter::{TrackingAdapter, absorb, join_location};
use crate::error::CarrierError;
use crate::http::{CarrierHttp, Reply, status_outcome};
use crate::phrases::{self, PhraseTable};
use crate::policy::RefreshPolicy;
use crate::timestamp;

pub const GLS_CARRIER: &str = "GLS";

const TABLES: &[PhraseTable] = &[
    phrases::CZECH,
    phrases::GERMAN,
    phrases::ENGLISH,
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlsResponse {
    #[serde(default)]
    tu_status: Vec<GlsParcel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlsParcel {
    progress_bar: Option<GlsProgress>,
    #[serde(default)]
    history: Vec<GlsEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlsProgress {
    status_info: Option<String>,
    status_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlsEvent {
    date: Option<String>,
    time: Option<String>,
    address: Option<GlsAddress>,
    evt_dscr: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlsAddress {
    city: Option<String>,
    country_name: Option<String>,
}

pub struct GlsAdapter {
    http: CarrierHttp,
    base_url: String,
    policy: RefreshPolicy,
}

impl GlsAdapter {
    pub fn new(base_url: impl Into<String>, http: CarrierHttp, policy: RefreshPolicy) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            policy,
        }
    }

    async fn query(&self, tracking_number: &str) -> Result<NormalizedTracking, CarrierError> {
        let request = self
            .http
            .client()
            .get(&self.base_url)
            .query(&[("match", tracking_number)]);

        match self.http.get_json::<GlsResponse>(GLS_CARRIER, request).await? {
            Reply::Body(body) => Ok(normalize(body)),
            Reply::Status(status) => status_outcome(GLS_CARRIER, status),
        }
    }
}

#[async_trait]
impl TrackingAdapter for GlsAdapter {
    fn carrier(&self) -> &str {
        GLS_CARRIER
    }

    fn refresh_policy(&self) -> RefreshPolicy {
        self.policy
    }

    #[tracing::instrument(skip(self), fields(carrier = GLS_CARRIER))]
    async fn fetch_tracking(
        &self,
        tracking_number: &str,
    ) -> Result<NormalizedTracking, CarrierError> {
        absorb(GLS_CARRIER, tracking_number, self.query(tracking_number).await)
    }
}

fn event_time(event: &GlsEvent) -> Option<String> {
    match (event.date.as_deref(), event.time.as_deref()) {
        (Some(date), Some(time)) => Some(format!("{date} {time}")),
        (Some(date), None) => Some(date.to_string()),
        _ => None,
    }
}

fn normalize(body: GlsResponse) -> NormalizedTracking {
    let Some(parcel) = body.tu_status.into_iter().next() else {
        return NormalizedTracking::not_yet_ingested();
    };
    let progress = parcel.progress_bar.unwrap_or_default();

    let checkpoints: Vec<Checkpoint> = parcel
        .history
        .iter()
        .filter_map(|event| {
            let timestamp = timestamp::parse_field(GLS_CARRIER, event_time(event).as_deref())?;
            let text = event.evt_dscr.as_deref()?;
            let location = event.address.as_ref().and_then(|a| {
                join_location([a.city.as_deref(), a.country_name.as_deref()])
            });
            let checkpoint = Checkpoint::new(timestamp, text);
            Some(match location {
                Some(location) => checkpoint.at(location),
                None => checkpoint,
            })
        })
        .collect();

    let newest = checkpoints
        .iter()
        .max_by_key(|c| c.timestamp)
        .map(|c| c.status_text.clone());

    if progress.status_info.is_none() && progress.status_text.is_none() && newest.is_none() {
        return NormalizedTracking::not_yet_ingested();
    }

    let status = phrases::classify(
        phrases::GLS_CODES,
        progress.status_info.as_deref(),
        TABLES,
        [
            progress.status_text.as_deref(),
            newest.as_deref(),
        ]
        .into_iter()
        .flatten(),
    );
    let label = progress
        .status_text
        .or(newest)
        .unwrap_or_else(|| status.default_label().to_string());

    NormalizedTracking::new(status, label, checkpoints, None)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use domain::TrackingStatus;

    use super::*;

    fn parse(json: &str) -> GlsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_delivered_parcel() {
        let body = parse(
            r#"{"tuStatus": [{
                "progressBar": {"statusInfo": "DELIVERED", "statusText": "Zásilka doručena"},
                "history": [
                    {"date": "2024-03-13", "time": "08:12:00", "address": {"city": "Praha", "countryName": "Česká republika"}, "evtDscr": "Zásilka opustila depo"},
                    {"date": "2024-03-14", "time": "13:45:00", "address": {"city": "Brno", "countryName": "Česká republika"}, "evtDscr": "Zásilka doručena"}
                ]
            }]}"#,
        );

        let tracking = normalize(body);
        assert_eq!(tracking.status_code(), TrackingStatus::Delivered);
        assert_eq!(tracking.status_label(), "Zásilka doručena");
        assert_eq!(
            tracking.delivered_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 13, 45, 0).unwrap())
        );
        assert_eq!(
            tracking.checkpoints()[0].location.as_deref(),
            Some("Brno, Česká republika")
        );
        assert_eq!(tracking.checkpoints()[1].status_text, "Zásilka opustila depo");
    }

    #[test]
    fn test_status_code_beats_description() {
        let body = parse(
            r#"{"tuStatus": [{
                "progressBar": {"statusInfo": "NOTDELIVERED", "statusText": "Nezastižen"},
                "history": [{"date": "2024-03-14", "time": "10:00:00", "evtDscr": "Zásilka doručována"}]
            }]}"#,
        );
        assert_eq!(normalize(body).status_code(), TrackingStatus::Exception);
    }

    #[test]
    fn test_negated_english_text_is_not_delivered() {
        let body = parse(
            r#"{"tuStatus": [{"progressBar": {"statusText": "Parcel undelivered"}, "history": []}]}"#,
        );
        assert_eq!(normalize(body).status_code(), TrackingStatus::Exception);

        let body = parse(
            r#"{"tuStatus": [{
                "progressBar": {"statusInfo": "UNKNOWN"},
                "history": [{"date": "2024-03-14", "time": "10:00:00", "evtDscr": "Parcel not delivered, consignee absent"}]
            }]}"#,
        );
        let tracking = normalize(body);
        assert_eq!(tracking.status_code(), TrackingStatus::Exception);
        assert_eq!(tracking.delivered_at(), None);
    }

    #[test]
    fn test_empty_response_is_not_yet_ingested() {
        let tracking = normalize(parse(r#"{"tuStatus": []}"#));
        assert_eq!(tracking.status_code(), TrackingStatus::Created);
        assert!(tracking.checkpoints().is_empty());

        let tracking = normalize(parse(r#"{}"#));
        assert_eq!(tracking.status_code(), TrackingStatus::Created);
    }

    #[test]
    fn test_unmatched_text_is_unknown() {
        let body = parse(
            r#"{"tuStatus": [{"progressBar": {"statusText": "Status 99"}, "history": []}]}"#,
        );
        let tracking = normalize(body);
        assert_eq!(tracking.status_code(), TrackingStatus::Unknown);
        assert_eq!(tracking.status_label(), "Status 99");
        assert!(!tracking.is_degraded());
    }
}
