//! One poller per user, owned by the service rather than by any client
//! connection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::domain::{CommutePreference, UserId};

use super::cycle::{AvailabilityPoller, PollerContext, PollerHandle};
use super::snapshot::AvailabilitySnapshot;

/// Running pollers, keyed by user.
#[derive(Clone)]
pub struct PollerRegistry {
    ctx: PollerContext,
    pollers: Arc<RwLock<HashMap<UserId, PollerHandle>>>,
}

impl PollerRegistry {
    pub fn new(ctx: PollerContext) -> Self {
        Self {
            ctx,
            pollers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start polling for a user, replacing (and cancelling) any existing
    /// poller. Returns `true` if an old poller was replaced.
    pub async fn start(&self, user_id: &str, preference: CommutePreference) -> bool {
        let handle = AvailabilityPoller::new(user_id, preference, self.ctx.clone()).spawn();

        let previous = self.pollers.write().await.insert(user_id.to_string(), handle);
        let replaced = previous.is_some();
        if let Some(old) = previous {
            old.stop();
        }

        info!(user = user_id, replaced, "commute preference applied");
        replaced
    }

    /// Stop a user's poller. Returns `false` if none was running.
    pub async fn stop(&self, user_id: &str) -> bool {
        match self.pollers.write().await.remove(user_id) {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self, user_id: &str) -> bool {
        self.pollers.read().await.contains_key(user_id)
    }

    pub async fn preference(&self, user_id: &str) -> Option<CommutePreference> {
        self.pollers
            .read()
            .await
            .get(user_id)
            .map(|h| h.preference().clone())
    }

    /// Latest snapshot for a user. `None` if no poller is running or it
    /// has not finished a cycle yet.
    pub async fn snapshot(&self, user_id: &str) -> Option<Arc<AvailabilitySnapshot>> {
        self.pollers.read().await.get(user_id).and_then(|h| h.latest())
    }

    pub async fn len(&self) -> usize {
        self.pollers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pollers.read().await.is_empty()
    }

    /// Stop every poller and wait for each loop to exit.
    pub async fn shutdown(&self) {
        let handles: Vec<PollerHandle> =
            self.pollers.write().await.drain().map(|(_, h)| h).collect();
        let count = handles.len();
        futures::future::join_all(handles.into_iter().map(PollerHandle::shutdown)).await;
        info!(count, "all pollers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarEngine, OverrideTables};
    use crate::domain::{PreferenceDraft, Station, StationCode};
    use crate::poller::PollerConfig;
    use crate::query::MockTransport;
    use crate::stations::{StaticStationSource, StationDirectory};
    use std::time::Duration;

    fn registry() -> PollerRegistry {
        let directory = StationDirectory::new(Arc::new(StaticStationSource::new(vec![
            Station {
                name: "北京".into(),
                code: StationCode::parse("BJP").unwrap(),
                pinyin: "beijing".into(),
                acronym: "bj".into(),
            },
            Station {
                name: "上海".into(),
                code: StationCode::parse("SHH").unwrap(),
                pinyin: "shanghai".into(),
                acronym: "sh".into(),
            },
        ])));
        PollerRegistry::new(PollerContext {
            directory,
            calendar: Arc::new(CalendarEngine::new(OverrideTables::builtin().unwrap())),
            transport: Arc::new(MockTransport::new()),
            store: None,
            config: PollerConfig::default()
                .with_candidate_days(2)
                .with_interval(Duration::from_millis(10)),
        })
    }

    fn preference(morning: &str) -> CommutePreference {
        CommutePreference::try_from(PreferenceDraft {
            from_station: Some("北京".into()),
            to_station: Some("上海".into()),
            morning_train_number: Some(morning.into()),
            evening_train_number: Some("G2".into()),
            seat_type: Some("二等座".into()),
        })
        .unwrap()
    }

    async fn wait_for_snapshot(registry: &PollerRegistry, user: &str) -> Arc<AvailabilitySnapshot> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(s) = registry.snapshot(user).await {
                    return s;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn start_publishes_and_stop_removes() {
        let registry = registry();
        assert!(!registry.start("u1", preference("G1")).await);
        assert!(registry.is_running("u1").await);

        let snapshot = wait_for_snapshot(&registry, "u1").await;
        assert_eq!(snapshot.dates.len(), 2);

        assert!(registry.stop("u1").await);
        assert!(!registry.is_running("u1").await);
        assert!(registry.snapshot("u1").await.is_none());
        assert!(!registry.stop("u1").await);
    }

    #[tokio::test]
    async fn new_preference_replaces_old_poller() {
        let registry = registry();
        registry.start("u1", preference("G1")).await;
        assert!(registry.start("u1", preference("G5")).await);

        assert_eq!(registry.len().await, 1);
        let pref = registry.preference("u1").await.unwrap();
        assert_eq!(pref.morning_train_number.as_str(), "G5");
    }

    #[tokio::test]
    async fn users_are_independent() {
        let registry = registry();
        registry.start("u1", preference("G1")).await;
        registry.start("u2", preference("G3")).await;

        registry.stop("u1").await;
        assert!(registry.is_running("u2").await);
        wait_for_snapshot(&registry, "u2").await;

        registry.shutdown().await;
        assert!(registry.is_empty().await);
    }
}
