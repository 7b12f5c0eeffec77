//! Queue depth inspection.

use std::sync::Arc;

use qscale_core::{QueueKeys, QueueSnapshot, Stage};

use crate::error::StoreResult;
use crate::store::QueueStore;

/// Reads the three stage depths for one (namespace, language) pair.
#[derive(Clone)]
pub struct QueueInspector {
    store: Arc<dyn QueueStore>,
    keys: QueueKeys,
}

impl QueueInspector {
    pub fn new(store: Arc<dyn QueueStore>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// Number of jobs currently in `stage`.
    pub async fn depth(&self, stage: Stage) -> StoreResult<u64> {
        self.store.list_len(&self.keys.stage(stage)).await
    }

    /// Read all three stages. Any failure fails the whole snapshot.
    pub async fn snapshot(&self) -> StoreResult<QueueSnapshot> {
        Ok(QueueSnapshot {
            in_len: self.depth(Stage::Pending).await?,
            proc_len: self.depth(Stage::Processing).await?,
            done_len: self.depth(Stage::Done).await?,
        })
    }
}
