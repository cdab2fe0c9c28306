//! Cache-Aside Resolver
//!
//! Decorates any resolver with a cache-first lookup. Misses are resolved by
//! the delegate and handed to a background write-back task, so callers never
//! wait on cache writes.

use crate::domain::entities::{CacheEntry, ResolutionResult};
use crate::domain::errors::ResolveError;
use crate::domain::ports::{KeyValueStore, Resolver};
use crate::domain::value_objects::LookupKey;
use crate::infrastructure::shutdown::ShutdownController;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached resolution stays valid
    pub ttl: Duration,
    /// Capacity of the write-back channel
    pub write_back_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            write_back_capacity: 1024,
        }
    }
}

/// Producer side of the write-back pipeline.
///
/// Enqueueing never blocks: when the channel is full the new result is
/// dropped (drop-new policy) and the next miss for that key fetches again.
#[derive(Clone)]
pub struct WriteBack {
    tx: mpsc::Sender<ResolutionResult>,
    dropped: Arc<AtomicU64>,
}

impl WriteBack {
    /// Start the single consumer task that persists results into `store`.
    ///
    /// The task runs until `shutdown` fires, then flushes whatever is still
    /// queued and exits. Await the returned handle to wait for the flush.
    pub fn spawn(
        store: Arc<dyn KeyValueStore>,
        config: &CacheConfig,
        shutdown: ShutdownController,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.write_back_capacity.max(1));
        let handle = tokio::spawn(Self::run(store, config.ttl, rx, shutdown));

        let write_back = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (write_back, handle)
    }

    /// Queue a result for persistence without waiting.
    pub fn enqueue(&self, result: ResolutionResult) {
        match self.tx.try_send(result) {
            Ok(()) => {}
            Err(TrySendError::Full(result)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "write-back queue full, dropping cache write for {}",
                    result.lookup_key
                );
            }
            Err(TrySendError::Closed(result)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "write-back pipeline stopped, dropping cache write for {}",
                    result.lookup_key
                );
            }
        }
    }

    /// Number of results dropped instead of being queued.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    async fn run(
        store: Arc<dyn KeyValueStore>,
        ttl: Duration,
        mut rx: mpsc::Receiver<ResolutionResult>,
        shutdown: ShutdownController,
    ) {
        let mut shutdown_rx = shutdown.subscribe();

        if !shutdown.is_shutdown() {
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(result) => Self::persist(store.as_ref(), ttl, result).await,
                        None => {
                            tracing::debug!("write-back pipeline stopped: all producers gone");
                            return;
                        }
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        }

        rx.close();
        let mut flushed = 0usize;
        while let Some(result) = rx.recv().await {
            Self::persist(store.as_ref(), ttl, result).await;
            flushed += 1;
        }
        tracing::debug!("write-back pipeline stopped, flushed {} pending writes", flushed);
    }

    async fn persist(store: &dyn KeyValueStore, ttl: Duration, result: ResolutionResult) {
        let store_key = CacheEntry::store_key(&result.lookup_key);
        let entry = CacheEntry::new(result, ttl);

        let value = match serde_json::to_string(&entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("cache write failure for {}: {}", store_key, e);
                return;
            }
        };

        match store.set_with_ttl(&store_key, value, ttl).await {
            Ok(()) => tracing::info!(
                "iin saved to cache: {} -> {}",
                entry.lookup_key,
                entry.country_code
            ),
            Err(e) => tracing::error!("cache write failure for {}: {}", store_key, e),
        }
    }
}

/// Resolver that consults the cache before its delegate.
///
/// Cache errors are absorbed: a failed read is a miss and a failed write is
/// only logged. No coalescing of concurrent misses for the same key.
pub struct CacheAsideResolver {
    delegate: Arc<dyn Resolver>,
    store: Arc<dyn KeyValueStore>,
    write_back: WriteBack,
}

impl CacheAsideResolver {
    /// Create a new cache-aside resolver.
    pub fn new(
        delegate: Arc<dyn Resolver>,
        store: Arc<dyn KeyValueStore>,
        write_back: WriteBack,
    ) -> Self {
        Self {
            delegate,
            store,
            write_back,
        }
    }

    /// Look up a cached resolution. Any failure counts as a miss.
    async fn lookup_cached(&self, key: &LookupKey) -> Option<ResolutionResult> {
        let store_key = CacheEntry::store_key(key);

        let raw = match self.store.get(&store_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("cache read failed for {}: {}", store_key, e);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("ignoring undecodable cache entry {}: {}", store_key, e);
                return None;
            }
        };

        if entry.lookup_key != *key || entry.is_expired() {
            return None;
        }

        Some(entry.into_result())
    }
}

#[async_trait]
impl Resolver for CacheAsideResolver {
    async fn resolve(&self, identifier: &str) -> Result<ResolutionResult, ResolveError> {
        let key = LookupKey::extract(identifier)?;

        if let Some(cached) = self.lookup_cached(&key).await {
            tracing::info!(
                "iin fetched from cache: {} -> {}",
                cached.lookup_key,
                cached.country_code
            );
            return Ok(cached);
        }

        tracing::debug!("cache miss for {}", key);
        let result = self.delegate.resolve(identifier).await?;
        self.write_back.enqueue(result.clone());

        Ok(result)
    }
}
