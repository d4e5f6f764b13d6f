//! The tracking orchestrator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use carriers::AdapterResolver;
use chrono::Utc;
use common::{OrderId, TrackingId};
use domain::{
    NewTrackingRecord, OrderStatus, ShipmentTrackingRecord, TrackingStatus, TrackingUpdate,
};
use futures_util::StreamExt;
use futures_util::stream;
use resilience::{BreakerRegistry, BreakerSnapshot};
use store::{CartonRepository, OrderRepository, ShipmentLabelRepository, TrackingRepository};

use crate::config::TrackingConfig;
use crate::error::{Result, TrackingError};
use crate::outcome::{RefreshKind, RefreshOutcome, SweepSummary};

/// Refreshes tracking records from carriers and reconciles order status.
///
/// The service is the only writer of tracking records. Each refresh attempt
/// ends in exactly one repository write: a full snapshot when the carrier
/// answered, or an error entry that leaves the last known data in place.
pub struct TrackingService<T, O, L, C, A>
where
    T: TrackingRepository,
    O: OrderRepository,
    L: ShipmentLabelRepository,
    C: CartonRepository,
    A: AdapterResolver,
{
    tracking: T,
    orders: O,
    labels: L,
    cartons: C,
    adapters: A,
    breakers: Arc<BreakerRegistry>,
    config: TrackingConfig,
}

impl<T, O, L, C, A> TrackingService<T, O, L, C, A>
where
    T: TrackingRepository,
    O: OrderRepository,
    L: ShipmentLabelRepository,
    C: CartonRepository,
    A: AdapterResolver,
{
    /// Creates a service with the default configuration.
    pub fn new(
        tracking: T,
        orders: O,
        labels: L,
        cartons: C,
        adapters: A,
        breakers: Arc<BreakerRegistry>,
    ) -> Self {
        Self {
            tracking,
            orders,
            labels,
            cartons,
            adapters,
            breakers,
            config: TrackingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Refreshes one record from its carrier.
    ///
    /// Returns `Ok(None)` if the record does not exist. Delivered records are
    /// never sent to the carrier but still trigger order reconciliation, so
    /// an order update missed earlier is picked up on the next pass.
    ///
    /// Carrier failures that propagate (rejected credentials, open auth
    /// circuit) are stored on the record and then returned as `Err`.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_tracking(&self, id: TrackingId) -> Result<Option<RefreshOutcome>> {
        let Some(record) = self.tracking.find_by_id(id).await? else {
            tracing::debug!("tracking record not found, nothing to refresh");
            return Ok(None);
        };

        if record.is_delivered() {
            let order_updated = self.reconcile_logged(record.order_id).await;
            return Ok(Some(RefreshOutcome {
                record,
                order_updated,
                kind: RefreshKind::AlreadyDelivered,
            }));
        }

        let adapter = self.adapters.resolve(&record.carrier);
        if !adapter.should_refresh(record.last_checked_at) {
            return Ok(Some(RefreshOutcome {
                record,
                order_updated: false,
                kind: RefreshKind::NotDue,
            }));
        }

        let carrier = adapter.carrier().to_string();
        let start = Instant::now();
        let fetched = adapter.fetch_tracking(&record.tracking_number).await;
        metrics::histogram!("tracking_refresh_duration_seconds", "carrier" => carrier.clone())
            .record(start.elapsed().as_secs_f64());

        match fetched {
            Ok(tracking) if tracking.is_degraded() => {
                let error = tracking
                    .degraded_reason()
                    .unwrap_or(tracking.status_label())
                    .to_string();
                let updated = self
                    .tracking
                    .update(
                        id,
                        TrackingUpdate::Failure {
                            error,
                            checked_at: Utc::now(),
                        },
                    )
                    .await?;
                count_refresh(&carrier, "degraded");
                Ok(Some(RefreshOutcome {
                    record: updated,
                    order_updated: false,
                    kind: RefreshKind::Degraded,
                }))
            }
            Ok(tracking) => {
                let delivered = tracking.status_code() == TrackingStatus::Delivered;
                let updated = self
                    .tracking
                    .update(
                        id,
                        TrackingUpdate::Snapshot {
                            tracking,
                            checked_at: Utc::now(),
                        },
                    )
                    .await?;
                count_refresh(&carrier, "fetched");
                tracing::info!(
                    carrier = %carrier,
                    status = %updated.status_code,
                    checkpoints = updated.checkpoints.len(),
                    "tracking refreshed"
                );

                let order_updated = if delivered {
                    self.reconcile_logged(updated.order_id).await
                } else {
                    false
                };
                Ok(Some(RefreshOutcome {
                    record: updated,
                    order_updated,
                    kind: RefreshKind::Fetched,
                }))
            }
            Err(err) => {
                tracing::warn!(carrier = %carrier, error = %err, "carrier query failed");
                self.tracking
                    .update(
                        id,
                        TrackingUpdate::Failure {
                            error: err.to_string(),
                            checked_at: Utc::now(),
                        },
                    )
                    .await?;
                count_refresh(&carrier, "error");
                Err(err.into())
            }
        }
    }

    /// Moves an order from `shipped` to `delivered` once all of its tracking
    /// records are delivered.
    ///
    /// Returns true only for the call that performed the transition. Safe to
    /// call repeatedly and concurrently for the same order.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_order(&self, order_id: OrderId) -> Result<bool> {
        let records = self.tracking.find_by_order_id(order_id).await?;
        if records.is_empty()
            || !records
                .iter()
                .all(|r| r.status_code == TrackingStatus::Delivered)
        {
            return Ok(false);
        }

        let Some(order) = self.orders.find_by_id(order_id).await? else {
            tracing::warn!("delivered tracking references a missing order");
            return Ok(false);
        };
        if !order.status.can_mark_delivered() {
            tracing::debug!(status = %order.status, "order not in shipped state, leaving as is");
            return Ok(false);
        }

        let updated = self
            .orders
            .compare_and_set_status(order_id, OrderStatus::Shipped, OrderStatus::Delivered)
            .await?;
        if updated {
            metrics::counter!("orders_reconciled_total").increment(1);
            tracing::info!(parcels = records.len(), "order marked delivered");
        }
        Ok(updated)
    }

    /// Reconciles every order that has at least one delivered record.
    ///
    /// Returns how many orders were moved to `delivered`. A failure on one
    /// order is logged and does not stop the scan.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_all_delivered_orders(&self) -> Result<usize> {
        let delivered = self
            .tracking
            .find_all_with_status(TrackingStatus::Delivered)
            .await?;

        let mut seen = HashSet::new();
        let order_ids: Vec<OrderId> = delivered
            .iter()
            .map(|r| r.order_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut updated = 0;
        for order_id in order_ids {
            match self.reconcile_order(order_id).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(%order_id, error = %err, "order reconciliation failed");
                }
            }
        }
        tracing::info!(orders_updated = updated, "delivered order backfill finished");
        Ok(updated)
    }

    /// Starts tracking every distinct tracking number on an order's labels
    /// and cartons.
    ///
    /// The carrier comes from the oldest label that names one. Without such
    /// a label nothing is created. Tracking numbers already tracked are left
    /// alone, so repeated calls are harmless. Returns the newly created records.
    #[tracing::instrument(skip(self))]
    pub async fn create_tracking_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<ShipmentTrackingRecord>> {
        if self.orders.find_by_id(order_id).await?.is_none() {
            return Err(TrackingError::OrderNotFound(order_id));
        }

        let labels = self.labels.find_by_order_id(order_id).await?;
        let Some(carrier) = labels.iter().find_map(|l| l.known_carrier()) else {
            tracing::debug!("no label with a carrier yet, tracking not created");
            return Ok(Vec::new());
        };
        let cartons = self.cartons.find_by_order_id(order_id).await?;

        let label_numbers = labels
            .iter()
            .map(|l| (l.tracking_number.as_deref(), l.carton_id));
        let carton_numbers = cartons
            .iter()
            .map(|c| (c.tracking_number.as_deref(), Some(c.id)));

        let mut seen = HashSet::new();
        let mut created = Vec::new();
        for (number, carton_id) in label_numbers.chain(carton_numbers) {
            let Some(number) = number.map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            if !seen.insert(number.to_string()) {
                continue;
            }
            let outcome = self
                .tracking
                .insert_if_absent(NewTrackingRecord {
                    order_id,
                    carton_id,
                    carrier: carrier.to_string(),
                    tracking_number: number.to_string(),
                })
                .await?;
            if outcome.was_inserted() {
                created.push(outcome.record().clone());
            }
        }

        if !created.is_empty() {
            tracing::info!(carrier, created = created.len(), "tracking created for order");
        }
        Ok(created)
    }

    /// Returns an order's tracking records, oldest first.
    pub async fn get_order_tracking(&self, order_id: OrderId) -> Result<Vec<ShipmentTrackingRecord>> {
        let mut records = self.tracking.find_by_order_id(order_id).await?;
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.tracking_number.cmp(&b.tracking_number))
        });
        Ok(records)
    }

    /// Refreshes every record that is not yet delivered, with bounded
    /// concurrency. Individual failures are counted, never returned.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_due(&self) -> Result<SweepSummary> {
        let mut ids = Vec::new();
        for status in TrackingStatus::ALL {
            if status == TrackingStatus::Delivered {
                continue;
            }
            let records = self.tracking.find_all_with_status(status).await?;
            ids.extend(records.into_iter().map(|r| r.id));
        }

        let mut summary = SweepSummary {
            examined: ids.len(),
            ..SweepSummary::default()
        };

        let mut results = stream::iter(ids)
            .map(|id| async move { (id, self.refresh_tracking(id).await) })
            .buffer_unordered(self.config.sweep_concurrency);

        while let Some((id, result)) = results.next().await {
            match result {
                Ok(outcome) => summary.record(outcome.as_ref()),
                Err(err) => {
                    tracing::warn!(tracking_id = %id, error = %err, "tracking refresh failed");
                    summary.record(None);
                }
            }
        }

        tracing::info!(
            examined = summary.examined,
            refreshed = summary.refreshed,
            skipped = summary.skipped,
            failed = summary.failed,
            orders_updated = summary.orders_updated,
            "tracking sweep finished"
        );
        Ok(summary)
    }

    /// Current state of one named circuit breaker.
    pub fn breaker(&self, name: &str) -> Option<BreakerSnapshot> {
        self.breakers.snapshot(name)
    }

    /// Current state of every circuit breaker.
    pub fn breakers(&self) -> Vec<BreakerSnapshot> {
        self.breakers.snapshots()
    }

    /// Forces a breaker closed. Returns false if no breaker has that name.
    pub fn reset_breaker(&self, name: &str) -> bool {
        self.breakers.reset(name)
    }

    async fn reconcile_logged(&self, order_id: OrderId) -> bool {
        match self.reconcile_order(order_id).await {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(%order_id, error = %err, "order reconciliation failed");
                false
            }
        }
    }
}

fn count_refresh(carrier: &str, outcome: &'static str) {
    metrics::counter!(
        "tracking_refresh_total",
        "carrier" => carrier.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
