// src/cache.rs
use crate::error::Result;
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct Entry<T> {
    value: T,
    fetched_at: Instant,
}

type Slot<T> = Arc<Mutex<Option<Entry<T>>>>;

/// Query results keyed by a semantic key, fresh for `stale_after`.
///
/// Each key has its own slot lock, so concurrent requests for the same key
/// wait on one fetch instead of issuing their own.
pub struct QueryCache<T> {
    name: &'static str,
    stale_after: Duration,
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(name: &'static str, stale_after: Duration) -> Self {
        Self {
            name,
            stale_after,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }
        self.sweep(&mut slots);
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Drops idle slots that hold nothing fresh. A slot that is locked or
    /// still referenced by a caller is kept.
    fn sweep(&self, slots: &mut HashMap<String, Slot<T>>) {
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => entry
                    .as_ref()
                    .map_or(false, |cached| cached.fetched_at.elapsed() < self.stale_after),
                Err(_) => true,
            }
        });
        let swept = before - slots.len();
        if swept > 0 {
            debug!("{} cache swept {} idle keys", self.name, swept);
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.slot(key).await;
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.stale_after {
                return Ok(cached.value.clone());
            }
        }

        debug!("{} cache miss for {:?}", self.name, key);
        let value = match fetch().await {
            Ok(value) => value,
            Err(e) => {
                if entry.is_none() {
                    let mut slots = self.slots.lock().await;
                    if slots.get(key).map_or(false, |held| Arc::ptr_eq(held, &slot)) {
                        slots.remove(key);
                    }
                }
                return Err(e);
            }
        };
        *entry = Some(Entry {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Stores `value` as freshly fetched, replacing whatever was cached.
    pub async fn put(&self, key: &str, value: T) {
        let slot = self.slot(key).await;
        *slot.lock().await = Some(Entry {
            value,
            fetched_at: Instant::now(),
        });
    }

    pub async fn invalidate(&self, key: &str) {
        self.slots.lock().await.remove(key);
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        self.slots
            .lock()
            .await
            .retain(|key, _| !key.starts_with(prefix));
    }
}
