//! Key-Value Store Port
//!
//! Defines the store shared by the rate counter and the issuer cache.
//! Implementations may use Redis or an in-process map; all that is required
//! is TTL support and the atomic primitives below.

use crate::domain::errors::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// String key-value store with per-key expiration.
///
/// Expired keys must behave exactly like absent keys for every operation.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`, if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration)
        -> Result<(), StoreError>;

    /// Atomically store `value` with `ttl` only if `key` is absent.
    ///
    /// Returns true if this call created the key.
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Atomically add one to the integer under `key` and return the new value.
    ///
    /// An absent key counts as zero and is created without expiration; an
    /// existing expiration is preserved.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomically give `key` an expiration of `ttl` if it currently has none.
    ///
    /// Returns true if the expiration was set. An absent key, or one that
    /// already expires, is left untouched.
    async fn expire_if_persistent(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}
