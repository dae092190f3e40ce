//! Short-lived draft cache.
//!
//! Identical concurrent requests share one in-flight computation. Only
//! successful drafts without a validation error are kept, for `ttl`.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::blockchain::client::RpcResult;
use crate::observability::metrics;
use crate::transfer::types::DraftResult;

type Slot = Arc<OnceCell<(Instant, DraftResult)>>;

pub struct DraftCache<K> {
    ttl: Duration,
    slots: DashMap<K, Slot>,
}

impl<K> DraftCache<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: DashMap::new(),
        }
    }

    fn is_fresh(&self, slot: &Slot) -> bool {
        match slot.get() {
            Some((at, _)) => at.elapsed() < self.ttl,
            // Still computing.
            None => true,
        }
    }

    fn slot(&self, key: &K) -> Slot {
        let mut entry = self.slots.entry(key.clone()).or_default();
        if !self.is_fresh(entry.value()) {
            *entry.value_mut() = Slot::default();
        }
        entry.value().clone()
    }

    fn evict(&self, key: &K, slot: &Slot) {
        self.slots.remove_if(key, |_, current| Arc::ptr_eq(current, slot));
    }

    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> RpcResult<DraftResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RpcResult<DraftResult>>,
    {
        let slot = self.slot(&key);
        let hit = slot.initialized();

        let outcome = slot
            .get_or_try_init(|| async { compute().await.map(|draft| (Instant::now(), draft)) })
            .await
            .map(|(_, draft)| draft.clone());
        metrics::record_draft_cache(hit);

        match &outcome {
            Ok(draft) if draft.error.is_none() => {}
            _ => self.evict(&key, &slot),
        }
        outcome
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        self.slots.retain(|_, slot| match slot.get() {
            Some((at, _)) => at.elapsed() < self.ttl,
            None => true,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
