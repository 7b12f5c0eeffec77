//! The idle-worker set.
//!
//! Workers add their own task id when they find no work; the scaler reads
//! the set, evicts a subset, and then clears it every tick. Nothing is
//! locked between readers and writers: an id added after the read is
//! simply wiped and will be re-added by the worker if it is still idle.

use std::sync::Arc;

use qscale_core::{QueueKeys, WorkerId};
use tracing::debug;

use crate::error::StoreResult;
use crate::store::QueueStore;

#[derive(Clone)]
pub struct IdleWorkerRegistry {
    store: Arc<dyn QueueStore>,
    keys: QueueKeys,
}

impl IdleWorkerRegistry {
    pub fn new(store: Arc<dyn QueueStore>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    /// Point-in-time read of the idle set.
    pub async fn read_candidates(&self) -> StoreResult<Vec<WorkerId>> {
        let candidates = self.store.set_members(&self.keys.idle()).await?;
        debug!(count = candidates.len(), key = %self.keys.idle(), "read idle candidates");
        Ok(candidates)
    }

    /// Drop one evicted worker from the set.
    pub async fn remove(&self, worker: &str) -> StoreResult<bool> {
        self.store.set_remove(&self.keys.idle(), worker).await
    }

    /// Empty the set, whether or not anything was evicted.
    pub async fn clear(&self) -> StoreResult<()> {
        self.store.delete(&self.keys.idle()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryQueueStore;
    use qscale_core::IdleKeyShape;

    const KEY: &str = "kluge:stt:english:idle";

    fn registry(store: &MemoryQueueStore) -> IdleWorkerRegistry {
        IdleWorkerRegistry::new(
            Arc::new(store.clone()),
            QueueKeys::new("kluge", "english", IdleKeyShape::Plain),
        )
    }

    #[tokio::test]
    async fn read_then_clear() {
        let store = MemoryQueueStore::new();
        store.add_member(KEY, "w1").await;
        store.add_member(KEY, "w2").await;

        let registry = registry(&store);
        assert_eq!(registry.read_candidates().await.unwrap(), vec!["w1", "w2"]);

        registry.clear().await.unwrap();
        assert!(registry.read_candidates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_on_empty_set_is_fine() {
        let store = MemoryQueueStore::new();
        registry(&store).clear().await.unwrap();
    }

    #[tokio::test]
    async fn remove_drops_a_single_worker() {
        let store = MemoryQueueStore::new();
        store.add_member(KEY, "w1").await;
        store.add_member(KEY, "w2").await;

        let registry = registry(&store);
        assert!(registry.remove("w1").await.unwrap());
        assert_eq!(store.members(KEY).await, vec!["w2"]);
    }

    #[tokio::test]
    async fn tokenized_shape_reads_other_key() {
        let store = MemoryQueueStore::new();
        store.add_member("kluge:stt:tok:english:idle", "w9").await;

        let registry = IdleWorkerRegistry::new(
            Arc::new(store.clone()),
            QueueKeys::new("kluge", "english", IdleKeyShape::Tokenized),
        );
        assert_eq!(registry.read_candidates().await.unwrap(), vec!["w9"]);
    }
}
