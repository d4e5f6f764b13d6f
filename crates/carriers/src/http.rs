//! Shared HTTP plumbing for carrier adapters.

use std::time::{Duration, Instant};

use domain::NormalizedTracking;
use reqwest::{RequestBuilder, StatusCode};
use resilience::with_timeout;
use serde::de::DeserializeOwned;

use crate::error::CarrierError;

/// A `reqwest` client plus the deadline applied to every carrier call.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct CarrierHttp {
    client: reqwest::Client,
    request_timeout: Duration,
}

/// Either a decoded 2xx body or the non-2xx status that came back instead.
pub(crate) enum Reply<T> {
    Body(T),
    Status(StatusCode),
}

impl CarrierHttp {
    pub fn new(request_timeout: Duration) -> Result<Self, CarrierError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("shipment-tracking/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CarrierError::ClientBuild)?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Sends `request` and decodes a JSON body on success.
    ///
    /// The whole exchange, body included, is bounded by the request timeout.
    pub(crate) async fn get_json<T>(
        &self,
        carrier: &str,
        request: RequestBuilder,
    ) -> Result<Reply<T>, CarrierError>
    where
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| CarrierError::transport(carrier, e))?;
            let status = response.status();
            if !status.is_success() {
                return Ok(Reply::Status(status));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| CarrierError::transport(carrier, e))?;
            serde_json::from_slice(&body)
                .map(Reply::Body)
                .map_err(|e| CarrierError::decode(carrier, e))
        };
        let result = with_timeout(exchange, self.request_timeout).await;

        metrics::histogram!(
            "carrier_request_duration_seconds",
            "carrier" => carrier.to_string()
        )
        .record(start.elapsed().as_secs_f64());

        result?
    }
}

/// Maps a non-2xx carrier status onto a tracking result.
///
/// 404 means the carrier has not ingested the label yet. 401/403 and 429
/// degrade with a descriptive label. Anything else is an error the adapter
/// absorbs into a generic degraded result.
pub(crate) fn status_outcome(
    carrier: &str,
    status: StatusCode,
) -> Result<NormalizedTracking, CarrierError> {
    match status {
        StatusCode::NOT_FOUND => Ok(NormalizedTracking::not_yet_ingested()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(NormalizedTracking::degraded(
            format!(
                "{carrier} rejected the API credentials (HTTP {}), check carrier configuration",
                status.as_u16()
            ),
        )),
        StatusCode::TOO_MANY_REQUESTS => Ok(NormalizedTracking::degraded(format!(
            "{carrier} rate limit reached, tracking will be retried later"
        ))),
        other => Err(CarrierError::Http {
            carrier: carrier.to_string(),
            status: other.as_u16(),
        }),
    }
}
