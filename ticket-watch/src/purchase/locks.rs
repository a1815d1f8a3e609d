//! Async mutexes keyed by value.
//!
//! An entry exists only while someone holds or waits for it; the last
//! guard to drop removes it, so the map stays as small as the set of
//! keys currently in use.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots<K> = StdMutex<HashMap<K, Arc<Mutex<()>>>>;

pub(crate) struct KeyedLocks<K> {
    slots: Slots<K>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        let guard = slot.lock_owned().await;

        KeyedGuard {
            slots: &self.slots,
            key,
            guard: Some(guard),
        }
    }

    /// Keys currently held or waited on.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub(crate) struct KeyedGuard<'a, K: Eq + Hash> {
    slots: &'a Slots<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<'_, K> {
    fn drop(&mut self) {
        // Release first so the slot's only remaining reference is the map's
        drop(self.guard.take());

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
