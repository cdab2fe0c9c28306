//! DashMap Key-Value Store
//!
//! Implements KeyValueStore using DashMap for lock-free concurrent access.
//! Atomic primitives run under the shard lock of the key's entry.

use crate::domain::errors::StoreError;
use crate::domain::ports::KeyValueStore;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A stored value and its optional deadline.
#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// DashMap-backed key-value store with TTL.
///
/// Expired keys are invisible to every operation and are removed lazily on
/// access or eagerly by the background sweeper.
pub struct DashMapKeyValueStore {
    entries: Arc<DashMap<String, StoredValue>>,
}

impl DashMapKeyValueStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Start the background sweeper.
    ///
    /// Removes expired entries every `interval`.
    pub fn start_sweeper(&self, interval: Duration) {
        let entries = self.entries.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let removed = Self::sweep(&entries);
                if removed > 0 {
                    tracing::debug!("store sweep removed {} expired entries", removed);
                }
            }
        });
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep(entries: &DashMap<String, StoredValue>) -> usize {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired_at(now));
        before.saturating_sub(entries.len())
    }
}

impl Default for DashMapKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for DashMapKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        if let Some(stored) = self.entries.get(key) {
            if !stored.is_expired_at(now) {
                return Ok(Some(stored.value.clone()));
            }
        }
        // Guard dropped above; re-check so a concurrent fresh write survives.
        self.entries
            .remove_if(key, |_, stored| stored.is_expired_at(now));
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_string(), StoredValue::new(value, Some(ttl)));
        Ok(())
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(now) {
                    occupied.insert(StoredValue::new(value, Some(ttl)));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, Some(ttl)));
                Ok(true)
            }
        }
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired_at(now) {
                    occupied.insert(StoredValue::new("1".to_string(), None));
                    return Ok(1);
                }

                let stored = occupied.get_mut();
                let current: i64 = stored
                    .value
                    .parse()
                    .map_err(|_| StoreError::NotAnInteger {
                        key: key.to_string(),
                    })?;
                let next = current + 1;
                stored.value = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new("1".to_string(), None));
                Ok(1)
            }
        }
    }

    async fn expire_if_persistent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        match self.entries.get_mut(key) {
            Some(mut stored) if stored.expires_at.is_none() => {
                stored.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
