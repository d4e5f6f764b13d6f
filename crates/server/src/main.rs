//! Tracking server entry point.

use std::sync::Arc;

use resilience::BreakerRegistry;
use server::config::{Config, LogFormat};
use server::{AppState, sweeper};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Breakers, carriers and the tracking service
    let breakers = Arc::new(BreakerRegistry::new(config.breaker_config()));
    let service = Arc::new(
        server::build_tracking_service(&config, breakers.clone())
            .expect("failed to build carrier adapters"),
    );
    let state = AppState::new(breakers);

    // 4. Scheduled sweep
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = match config.sweep_period() {
        Some(period) => {
            tracing::info!(period_secs = period.as_secs(), "starting tracking sweeper");
            Some(tokio::spawn(sweeper::run(
                service,
                state.clone(),
                period,
                shutdown_rx,
            )))
        }
        None => {
            tracing::info!("tracking sweeper disabled");
            None
        }
    };

    // 5. Start server
    let app = server::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting tracking server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper
        && let Err(e) = handle.await
    {
        tracing::error!(error = %e, "tracking sweeper task failed");
    }

    tracing::info!("server shut down gracefully");
}
