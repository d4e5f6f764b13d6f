use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, TrackingId};
use domain::{
    Carton, NewTrackingRecord, Order, OrderStatus, ShipmentLabel, ShipmentTrackingRecord,
    TrackingStatus, TrackingUpdate,
};
use tokio::sync::RwLock;

use crate::repository::{
    CartonRepository, InsertOutcome, OrderRepository, ShipmentLabelRepository, TrackingRepository,
};
use crate::{Result, StoreError};

fn sort_records(records: &mut [ShipmentTrackingRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.tracking_number.cmp(&b.tracking_number))
    });
}

/// In-memory tracking record store.
///
/// Records are keyed by id; the tracking-number uniqueness rule is enforced
/// under the write lock in `insert_if_absent`.
#[derive(Clone, Default)]
pub struct InMemoryTrackingRepository {
    records: Arc<RwLock<HashMap<TrackingId, ShipmentTrackingRecord>>>,
}

impl InMemoryTrackingRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record as-is, replacing any record with the same id.
    pub async fn put(&self, record: ShipmentTrackingRecord) {
        self.records.write().await.insert(record.id, record);
    }

    /// Returns the total number of records stored.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns every record, oldest first.
    pub async fn all(&self) -> Vec<ShipmentTrackingRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        sort_records(&mut records);
        records
    }
}

#[async_trait]
impl TrackingRepository for InMemoryTrackingRepository {
    async fn find_by_id(&self, id: TrackingId) -> Result<Option<ShipmentTrackingRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Vec<ShipmentTrackingRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn find_all_with_status(
        &self,
        status: TrackingStatus,
    ) -> Result<Vec<ShipmentTrackingRecord>> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.status_code == status)
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn insert_if_absent(&self, new: NewTrackingRecord) -> Result<InsertOutcome> {
        let mut records = self.records.write().await;

        if let Some(existing) = records
            .values()
            .find(|r| r.tracking_number == new.tracking_number)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let record = ShipmentTrackingRecord::new(new, Utc::now());
        records.insert(record.id, record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    async fn update(
        &self,
        id: TrackingId,
        update: TrackingUpdate,
    ) -> Result<ShipmentTrackingRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Tracking record", id))?;
        record.apply(update);
        Ok(record.clone())
    }
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    status_writes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an order.
    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    /// Returns an order's current status.
    pub async fn status_of(&self, id: OrderId) -> Option<OrderStatus> {
        self.orders.read().await.get(&id).map(|o| o.status)
    }

    /// Returns how many status writes have been performed.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Makes every call fail with a backend error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("order store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        self.check_available()?;
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        order.status = status;
        order.updated_at = Utc::now();
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<bool> {
        self.check_available()?;
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        if order.status != expected {
            tracing::debug!(%id, current = %order.status, %expected, "order status compare-and-set skipped");
            return Ok(false);
        }
        order.status = new;
        order.updated_at = Utc::now();
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

/// In-memory shipping label store.
#[derive(Clone, Default)]
pub struct InMemoryShipmentLabelRepository {
    labels: Arc<RwLock<Vec<ShipmentLabel>>>,
}

impl InMemoryShipmentLabelRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a label.
    pub async fn insert(&self, label: ShipmentLabel) {
        self.labels.write().await.push(label);
    }
}

#[async_trait]
impl ShipmentLabelRepository for InMemoryShipmentLabelRepository {
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Vec<ShipmentLabel>> {
        let mut labels: Vec<_> = self
            .labels
            .read()
            .await
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect();
        labels.sort_by_key(|l| l.created_at);
        Ok(labels)
    }
}

/// In-memory carton store.
#[derive(Clone, Default)]
pub struct InMemoryCartonRepository {
    cartons: Arc<RwLock<Vec<Carton>>>,
}

impl InMemoryCartonRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a carton.
    pub async fn insert(&self, carton: Carton) {
        self.cartons.write().await.push(carton);
    }
}

#[async_trait]
impl CartonRepository for InMemoryCartonRepository {
    async fn find_by_order_id(&self, order_id: OrderId) -> Result<Vec<Carton>> {
        Ok(self
            .cartons
            .read()
            .await
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect())
    }
}
