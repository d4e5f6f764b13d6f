//! Scheduled tracking sweep.

use std::sync::Arc;
use std::time::Duration;

use carriers::AdapterResolver;
use store::{CartonRepository, OrderRepository, ShipmentLabelRepository, TrackingRepository};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracking::{SweepSummary, TrackingService};

use crate::AppState;

/// Runs one sweep and publishes its summary to `state`.
pub async fn sweep_once<T, O, L, C, A>(
    service: &TrackingService<T, O, L, C, A>,
    state: &AppState,
) -> Option<SweepSummary>
where
    T: TrackingRepository,
    O: OrderRepository,
    L: ShipmentLabelRepository,
    C: CartonRepository,
    A: AdapterResolver,
{
    match service.refresh_due().await {
        Ok(summary) => {
            state.record_sweep(summary).await;
            Some(summary)
        }
        Err(e) => {
            tracing::error!(error = %e, "tracking sweep failed");
            None
        }
    }
}

/// Backfills delivered orders, then sweeps every `period` until `shutdown`
/// flips to true.
pub async fn run<T, O, L, C, A>(
    service: Arc<TrackingService<T, O, L, C, A>>,
    state: AppState,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    T: TrackingRepository,
    O: OrderRepository,
    L: ShipmentLabelRepository,
    C: CartonRepository,
    A: AdapterResolver,
{
    match service.reconcile_all_delivered_orders().await {
        Ok(updated) => tracing::info!(updated, "startup reconciliation finished"),
        Err(e) => tracing::error!(error = %e, "startup reconciliation failed"),
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
        sweep_once(service.as_ref(), &state).await;
    }

    tracing::info!("tracking sweeper stopped");
}
