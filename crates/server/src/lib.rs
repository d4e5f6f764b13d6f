//! HTTP service wrapping the tracking subsystem.
//!
//! Wires the in-memory stores, carrier adapters and breaker registry into a
//! [`TrackingService`], runs the scheduled sweep, and exposes health,
//! Prometheus metrics and circuit breaker administration over HTTP.

pub mod config;
pub mod error;
pub mod routes;
pub mod sweeper;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use carriers::{CachedTokenProvider, CarrierError, CarrierHttp, CarrierRegistry, ClientCredentialsSource};
use carriers::ppl::PPL_CARRIER;
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::BreakerRegistry;
use store::{
    InMemoryCartonRepository, InMemoryOrderRepository, InMemoryShipmentLabelRepository,
    InMemoryTrackingRepository,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracking::{SweepSummary, TrackingService};

use config::Config;

/// The service as wired by this binary.
pub type AppTrackingService = TrackingService<
    InMemoryTrackingRepository,
    InMemoryOrderRepository,
    InMemoryShipmentLabelRepository,
    InMemoryCartonRepository,
    CarrierRegistry,
>;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub breakers: Arc<BreakerRegistry>,
    last_sweep: Arc<RwLock<Option<SweepSummary>>>,
}

impl AppState {
    pub fn new(breakers: Arc<BreakerRegistry>) -> Self {
        Self {
            breakers,
            last_sweep: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn last_sweep(&self) -> Option<SweepSummary> {
        *self.last_sweep.read().await
    }

    pub async fn record_sweep(&self, summary: SweepSummary) {
        *self.last_sweep.write().await = Some(summary);
    }
}

/// Builds the tracking service from configuration.
///
/// PPL credentials are registered with the token source; the remaining
/// carriers need none or carry their own key.
pub fn build_tracking_service(
    config: &Config,
    breakers: Arc<BreakerRegistry>,
) -> Result<AppTrackingService, CarrierError> {
    let http = CarrierHttp::new(config.carriers.request_timeout)?;
    let token_source = ClientCredentialsSource::new(http.client().clone())
        .with_carrier(PPL_CARRIER, config.carriers.ppl.credentials());
    let tokens = Arc::new(CachedTokenProvider::new(token_source));

    let adapters = CarrierRegistry::new(
        &config.carriers,
        config.refresh_policy(),
        tokens,
        &breakers,
    )?;

    Ok(TrackingService::new(
        InMemoryTrackingRepository::new(),
        InMemoryOrderRepository::new(),
        InMemoryShipmentLabelRepository::new(),
        InMemoryCartonRepository::new(),
        adapters,
        breakers,
    )
    .with_config(config.tracking_config()))
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/breakers", get(routes::breakers::list))
        .route("/breakers/{name}", get(routes::breakers::get))
        .route("/breakers/{name}/reset", post(routes::breakers::reset))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
