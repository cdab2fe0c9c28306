//! Rate Limiter
//!
//! Fixed-window call counter shared by every resolver instance through the
//! key-value store.

use crate::domain::errors::{ResolveError, StoreError};
use crate::domain::ports::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;

/// Default store key of the shared counter.
pub const DEFAULT_COUNTER_KEY: &str = "api-call-counter";

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum upstream calls per window
    pub max_calls: u64,
    /// Window length; the counter expires this long after it is armed
    pub window: Duration,
    /// Store key holding the counter
    pub counter_key: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 5,
            window: Duration::from_secs(60),
            counter_key: DEFAULT_COUNTER_KEY.to_string(),
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitResult {
    /// Call is allowed
    Allowed { remaining: u64 },
    /// Call is rate limited; `calls` is the post-increment count
    Limited { calls: u64 },
}

/// Fixed-window rate limiter.
///
/// The counter is armed with the window TTL only when absent, then
/// incremented on every check. Denied calls still count, so a caller that
/// keeps hammering stays denied until the key expires. Up to twice the
/// nominal rate can pass across a window boundary.
pub struct FixedWindowRateLimiter {
    store: Arc<dyn KeyValueStore>,
    config: RateLimitConfig,
}

impl FixedWindowRateLimiter {
    /// Create a new rate limiter over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count one call and report whether it fits in the current window.
    pub async fn check(&self) -> Result<RateLimitResult, StoreError> {
        let key = &self.config.counter_key;

        if self
            .store
            .set_if_absent_with_ttl(key, "0".to_string(), self.config.window)
            .await?
        {
            tracing::debug!("rate limit window armed for {:?}", self.config.window);
        }

        let calls = self.store.increment(key).await?.max(0) as u64;

        // A count of one means this call opened the window. If the armed key
        // expired before the increment, the counter was recreated without a
        // TTL and would never reset.
        if calls == 1
            && self
                .store
                .expire_if_persistent(key, self.config.window)
                .await?
        {
            tracing::debug!("rate limit window re-armed after expiry race");
        }

        if calls > self.config.max_calls {
            Ok(RateLimitResult::Limited { calls })
        } else {
            Ok(RateLimitResult::Allowed {
                remaining: self.config.max_calls - calls,
            })
        }
    }

    /// Acquire a permit for one upstream call.
    ///
    /// Fails with `RateLimitExceeded` when the window is spent, or with
    /// `Store` when the counter cannot be updated.
    pub async fn try_acquire(&self) -> Result<(), ResolveError> {
        match self.check().await? {
            RateLimitResult::Allowed { remaining } => {
                tracing::trace!("rate limit permit granted, {} remaining", remaining);
                Ok(())
            }
            RateLimitResult::Limited { calls } => {
                tracing::warn!(
                    "rate limit exceeded: {} calls in window (max {})",
                    calls,
                    self.config.max_calls
                );
                Err(ResolveError::RateLimitExceeded)
            }
        }
    }
}
