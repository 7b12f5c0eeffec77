//! Queue store backends.
//!
//! The scaler only needs four primitives from the shared store: list
//! length, set members, set removal, and key deletion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Minimal view of a Redis-like store.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Length of the list at `key`. A missing key is zero.
    async fn list_len(&self, key: &str) -> StoreResult<u64>;

    /// All members of the set at `key`. A missing key is empty.
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Remove `member` from the set at `key`. Returns whether it was present.
    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Delete `key` unconditionally.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

// ── Redis ──────────────────────────────────────────────────────────

/// Production backend over a multiplexed Redis connection.
///
/// The connection is cheap to clone; each call clones it to get a
/// mutable handle.
#[derive(Clone)]
pub struct RedisQueueStore {
    conn: MultiplexedConnection,
}

impl RedisQueueStore {
    /// Connect to `url` (`redis://host:port/db`).
    ///
    /// `timeout` bounds both the connect and every later command.
    pub async fn connect(url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client
            .get_multiplexed_async_connection_with_timeouts(timeout, timeout)
            .await?;
        info!(addr = %client.get_connection_info().addr, "connected to queue store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl QueueStore for RedisQueueStore {
    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.srem(key, member).await?;
        Ok(removed > 0)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(key).await?;
        debug!(%key, deleted, "deleted key");
        Ok(())
    }
}

// ── In-memory ──────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    lists: HashMap<String, u64>,
    /// Sets keep insertion order so iteration is deterministic.
    sets: HashMap<String, Vec<String>>,
    unavailable: bool,
}

/// In-process store used by tests and dry runs.
///
/// `Clone` shares the same underlying state, so a test can keep a handle
/// and mutate queue depths between ticks.
#[derive(Clone, Default)]
pub struct MemoryQueueStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the length of the list at `key`.
    pub async fn set_list_len(&self, key: &str, len: u64) {
        self.inner.lock().await.lists.insert(key.to_string(), len);
    }

    /// Add `member` to the set at `key`, as a worker reporting idle would.
    pub async fn add_member(&self, key: &str, member: &str) {
        let mut state = self.inner.lock().await;
        let set = state.sets.entry(key.to_string()).or_default();
        if !set.iter().any(|m| m == member) {
            set.push(member.to_string());
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }

    /// Current members of a set, without the availability check.
    pub async fn members(&self, key: &str) -> Vec<String> {
        let state = self.inner.lock().await;
        state.sets.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        let state = self.inner.lock().await;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        Ok(state.lists.get(key).copied().unwrap_or(0))
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let state = self.inner.lock().await;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        Ok(state.sets.get(key).cloned().unwrap_or_default())
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut state = self.inner.lock().await;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        let Some(set) = state.sets.get_mut(key) else {
            return Ok(false);
        };
        let before = set.len();
        set.retain(|m| m != member);
        Ok(set.len() < before)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut state = self.inner.lock().await;
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        state.lists.remove(key);
        state.sets.remove(key);
        Ok(())
    }
}
