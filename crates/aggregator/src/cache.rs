//! Snapshot cache and rate gate over a single key-value slot

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use coinpeek_core::{PriceSnapshot, STORAGE_KEY};

/// Durable key-value collaborator. The service uses one logical slot.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
}

/// In-memory store, used in tests and as a non-durable default
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.slots.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Owns the cached snapshot slot and the rate-limit clock.
///
/// Expects a single writer: the clock is an atomic epoch-millis value
/// and the snapshot is replaced wholesale through the store, so no
/// further locking is needed.
pub struct SnapshotCache {
    store: Arc<dyn KeyValueStore>,
    last_fetch_ms: AtomicU64,
    min_request_interval: Duration,
    freshness_threshold: Duration,
}

impl SnapshotCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        min_request_interval: Duration,
        freshness_threshold: Duration,
    ) -> Self {
        Self {
            store,
            last_fetch_ms: AtomicU64::new(0),
            min_request_interval,
            freshness_threshold,
        }
    }

    /// Last persisted snapshot, or `None`. A corrupt slot reads as absent.
    pub async fn read(&self) -> Option<PriceSnapshot> {
        let raw = self.store.get(STORAGE_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "discarding corrupt cached snapshot");
                None
            }
        }
    }

    /// Atomically replace the cached snapshot
    pub async fn write(&self, snapshot: &PriceSnapshot) -> anyhow::Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.store.set(STORAGE_KEY, raw).await
    }

    /// True when enough wall-clock time has passed since the last
    /// successful fetch. Force-refresh paths bypass this check.
    pub fn can_fetch(&self, now_ms: u64) -> bool {
        let last = self.last_fetch_ms.load(Ordering::Acquire);
        now_ms.saturating_sub(last) >= self.min_request_interval.as_millis() as u64
    }

    /// Advance the rate-limit clock. Called only after a successful,
    /// validated price fetch, never on cache hits or failures.
    pub fn mark_fetched(&self, now_ms: u64) {
        self.last_fetch_ms.store(now_ms, Ordering::Release);
    }

    /// Old enough that a fresh fetch is warranted
    pub fn is_stale(&self, snapshot: &PriceSnapshot, now_ms: u64) -> bool {
        snapshot.is_stale(now_ms, self.freshness_threshold)
    }
}
