//! Persistence seam for tasks and purchases.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{PurchaseKey, RpaTask, RpaTaskId, TicketPurchase, WatchTask, WatchTaskId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Keyed storage for watch tasks, RPA tasks and the purchase ledger.
///
/// `put_*` methods insert or replace the whole record.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn put_watch_task(&self, task: WatchTask) -> Result<(), StoreError>;
    async fn watch_task(&self, id: WatchTaskId) -> Result<Option<WatchTask>, StoreError>;
    async fn watch_tasks_for_user(&self, user_id: &str) -> Result<Vec<WatchTask>, StoreError>;

    async fn put_rpa_task(&self, task: RpaTask) -> Result<(), StoreError>;
    async fn rpa_task(&self, id: RpaTaskId) -> Result<Option<RpaTask>, StoreError>;
    async fn rpa_tasks_for(&self, watch_task_id: WatchTaskId) -> Result<Vec<RpaTask>, StoreError>;

    async fn put_purchase(&self, purchase: TicketPurchase) -> Result<(), StoreError>;
    async fn purchase(&self, key: &PurchaseKey) -> Result<Option<TicketPurchase>, StoreError>;
}

/// Process-local store. State is lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    watch_tasks: Arc<RwLock<HashMap<WatchTaskId, WatchTask>>>,
    rpa_tasks: Arc<RwLock<HashMap<RpaTaskId, RpaTask>>>,
    purchases: Arc<RwLock<HashMap<PurchaseKey, TicketPurchase>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn put_watch_task(&self, task: WatchTask) -> Result<(), StoreError> {
        self.watch_tasks.write().await.insert(task.id, task);
        Ok(())
    }

    async fn watch_task(&self, id: WatchTaskId) -> Result<Option<WatchTask>, StoreError> {
        Ok(self.watch_tasks.read().await.get(&id).cloned())
    }

    async fn watch_tasks_for_user(&self, user_id: &str) -> Result<Vec<WatchTask>, StoreError> {
        let mut tasks: Vec<WatchTask> = self
            .watch_tasks
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn put_rpa_task(&self, task: RpaTask) -> Result<(), StoreError> {
        self.rpa_tasks.write().await.insert(task.id, task);
        Ok(())
    }

    async fn rpa_task(&self, id: RpaTaskId) -> Result<Option<RpaTask>, StoreError> {
        Ok(self.rpa_tasks.read().await.get(&id).cloned())
    }

    async fn rpa_tasks_for(&self, watch_task_id: WatchTaskId) -> Result<Vec<RpaTask>, StoreError> {
        let mut tasks: Vec<RpaTask> = self
            .rpa_tasks
            .read()
            .await
            .values()
            .filter(|t| t.watch_task_id == watch_task_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn put_purchase(&self, purchase: TicketPurchase) -> Result<(), StoreError> {
        self.purchases.write().await.insert(purchase.key(), purchase);
        Ok(())
    }

    async fn purchase(&self, key: &PurchaseKey) -> Result<Option<TicketPurchase>, StoreError> {
        Ok(self.purchases.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PurchaseStatus, TrainNumber, WatchStatus};
    use chrono::{Duration, NaiveDate, Utc};

    fn watch_task(user: &str, minutes_ago: i64) -> WatchTask {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        WatchTask {
            id: WatchTaskId::new(),
            user_id: user.to_string(),
            from_station: "北京".to_string(),
            to_station: "上海".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            preferred_trains: vec![TrainNumber::parse("G1").unwrap()],
            seat_types: vec![],
            status: WatchStatus::Active,
            current_rpa_task: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn watch_tasks_round_trip_and_replace() {
        let store = InMemoryTaskStore::new();
        let mut task = watch_task("u1", 0);
        store.put_watch_task(task.clone()).await.unwrap();

        task.status = WatchStatus::Stopped;
        store.put_watch_task(task.clone()).await.unwrap();

        let loaded = store.watch_task(task.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, WatchStatus::Stopped);
        assert!(store.watch_task(WatchTaskId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tasks_for_user_are_oldest_first() {
        let store = InMemoryTaskStore::new();
        let newer = watch_task("u1", 1);
        let older = watch_task("u1", 10);
        store.put_watch_task(newer.clone()).await.unwrap();
        store.put_watch_task(older.clone()).await.unwrap();
        store.put_watch_task(watch_task("u2", 5)).await.unwrap();

        let ids: Vec<_> = store
            .watch_tasks_for_user("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn rpa_tasks_by_watch_task() {
        let store = InMemoryTaskStore::new();
        let watch = WatchTaskId::new();
        let first = RpaTask::pending(watch, Utc::now() - Duration::seconds(5));
        let second = RpaTask::pending(watch, Utc::now());
        store.put_rpa_task(second.clone()).await.unwrap();
        store.put_rpa_task(first.clone()).await.unwrap();
        store
            .put_rpa_task(RpaTask::pending(WatchTaskId::new(), Utc::now()))
            .await
            .unwrap();

        let ids: Vec<_> = store
            .rpa_tasks_for(watch)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(store.rpa_task(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn purchases_keyed_by_leg() {
        let store = InMemoryTaskStore::new();
        let purchase = TicketPurchase {
            user_id: "u1".to_string(),
            train_number: "G1".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            purchase_status: PurchaseStatus::Pending,
            updated_at: Utc::now(),
        };
        store.put_purchase(purchase.clone()).await.unwrap();

        let mut updated = purchase.clone();
        updated.purchase_status = PurchaseStatus::Purchased;
        store.put_purchase(updated).await.unwrap();

        let loaded = store.purchase(&purchase.key()).await.unwrap().unwrap();
        assert_eq!(loaded.purchase_status, PurchaseStatus::Purchased);

        let mut other = purchase.key();
        other.train_number = "G3".to_string();
        assert!(store.purchase(&other).await.unwrap().is_none());
    }
}
