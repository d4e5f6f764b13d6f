//! Integration tests for the tracking server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use carriers::{
    CachedTokenProvider, CarrierHttp, CarrierRegistry, CarrierSettings, ClientCredentialsSource,
    RefreshPolicy,
};
use domain::{NewTrackingRecord, Order, OrderId, OrderStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::{BreakerRegistry, CircuitBreakerConfig, CircuitState};
use serde_json::Value;
use server::{AppState, sweeper};
use store::{
    InMemoryCartonRepository, InMemoryOrderRepository, InMemoryShipmentLabelRepository,
    InMemoryTrackingRepository, TrackingRepository,
};
use tokio::sync::watch;
use tower::ServiceExt;
use tracking::TrackingService;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn breakers() -> Arc<BreakerRegistry> {
    Arc::new(BreakerRegistry::new(CircuitBreakerConfig::new(
        1,
        Duration::from_secs(60),
        Duration::from_secs(1),
    )))
}

fn setup() -> (axum::Router, AppState) {
    let state = AppState::new(breakers());
    let app = server::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn send(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn trip(state: &AppState, name: &str) {
    let breaker = state.breakers.get_or_create(name);
    let _ = breaker
        .execute(|| async { Err::<(), _>("carrier unavailable") })
        .await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = send_json(app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["last_sweep"].is_null());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let (status, _) = send(app, "GET", "/metrics").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_list_breakers() {
    let (app, state) = setup();
    state.breakers.get_or_create("ppl-auth");
    trip(&state, "dhl").await;

    let (status, json) = send_json(app, "GET", "/breakers").await;

    assert_eq!(status, StatusCode::OK);
    let breakers = json.as_array().unwrap();
    assert_eq!(breakers.len(), 2);
    let dhl = breakers.iter().find(|b| b["name"] == "dhl").unwrap();
    assert_eq!(dhl["state"], "open");
    assert_eq!(dhl["consecutive_failures"], 1);
}

#[tokio::test]
async fn test_get_breaker() {
    let (app, state) = setup();
    state.breakers.get_or_create("ppl-auth");

    let (status, json) = send_json(app, "GET", "/breakers/ppl-auth").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "ppl-auth");
    assert_eq!(json["state"], "closed");
}

#[tokio::test]
async fn test_get_unknown_breaker_returns_404() {
    let (app, _) = setup();

    let (status, json) = send_json(app, "GET", "/breakers/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_reset_closes_open_breaker() {
    let (app, state) = setup();
    trip(&state, "ppl-auth").await;

    let (status, json) = send_json(app, "POST", "/breakers/ppl-auth/reset").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "closed");
    assert_eq!(json["consecutive_failures"], 0);
    assert_eq!(
        state.breakers.get("ppl-auth").unwrap().state(),
        CircuitState::Closed
    );
}

#[tokio::test]
async fn test_reset_unknown_breaker_returns_404() {
    let (app, _) = setup();

    let (status, _) = send(app, "POST", "/breakers/nope/reset").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Sweeper ─────────────────────────────────────────────────────────

type TestService = TrackingService<
    InMemoryTrackingRepository,
    InMemoryOrderRepository,
    InMemoryShipmentLabelRepository,
    InMemoryCartonRepository,
    CarrierRegistry,
>;

/// A service whose only record belongs to an unintegrated carrier, so a
/// sweep never leaves the process.
async fn service_with_generic_record(breakers: Arc<BreakerRegistry>) -> Arc<TestService> {
    let tracking = InMemoryTrackingRepository::new();
    let orders = InMemoryOrderRepository::new();
    let order_id = OrderId::new();
    orders.insert(Order::new(order_id, OrderStatus::Shipped)).await;
    tracking
        .insert_if_absent(NewTrackingRecord {
            order_id,
            carton_id: None,
            carrier: "Zasilkovna".to_string(),
            tracking_number: "Z123456789".to_string(),
        })
        .await
        .unwrap();

    let http = CarrierHttp::new(Duration::from_secs(1)).unwrap();
    let tokens = Arc::new(CachedTokenProvider::new(ClientCredentialsSource::new(
        http.client().clone(),
    )));
    let adapters = CarrierRegistry::new(
        &CarrierSettings::default(),
        RefreshPolicy::default(),
        tokens,
        &breakers,
    )
    .unwrap();

    Arc::new(TrackingService::new(
        tracking,
        orders,
        InMemoryShipmentLabelRepository::new(),
        InMemoryCartonRepository::new(),
        adapters,
        breakers,
    ))
}

#[tokio::test]
async fn test_sweep_summary_is_reported_by_health() {
    let (app, state) = setup();
    let service = service_with_generic_record(state.breakers.clone()).await;

    let summary = sweeper::sweep_once(service.as_ref(), &state).await.unwrap();
    assert_eq!(summary.examined, 1);
    assert_eq!(summary.refreshed, 1);

    let (status, json) = send_json(app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["last_sweep"]["examined"], 1);
    assert_eq!(json["last_sweep"]["refreshed"], 1);
    assert_eq!(json["last_sweep"]["failed"], 0);
}

#[tokio::test]
async fn test_sweeper_runs_immediately_and_stops_on_shutdown() {
    let (_, state) = setup();
    let service = service_with_generic_record(state.breakers.clone()).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(sweeper::run(
        service,
        state.clone(),
        Duration::from_secs(3600),
        shutdown_rx,
    ));

    // The first tick fires at once.
    for _ in 0..100 {
        if state.last_sweep().await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state.last_sweep().await.unwrap().examined, 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper did not stop")
        .unwrap();
}
