use crate::adapters::outbound::UpstreamConfig;
use crate::application::CacheConfig;
use crate::infrastructure::rate_limiter::{RateLimitConfig, DEFAULT_COUNTER_KEY};
use crate::infrastructure::retry::RetryConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Upstream lookup provider
    pub upstream_url: String,
    pub upstream_timeout_ms: u64,

    // Issuer cache
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub write_back_capacity: usize,
    pub store_sweep_secs: u64,

    // Upstream call budget
    pub rate_limit_max_calls: u64,
    pub rate_limit_window_secs: u64,

    // Retry policy
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_jitter: f64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream_url: "https://lookup.binlist.net".to_string(),
            upstream_timeout_ms: 5000,
            cache_enabled: true,
            cache_ttl_secs: 86400,
            write_back_capacity: 1024,
            store_sweep_secs: 30,
            rate_limit_max_calls: 5,
            rate_limit_window_secs: 60,
            retry_max_attempts: 3,
            retry_base_delay_ms: 3000,
            retry_jitter: 0.75,
            debug: false,
        }
    }
}

impl Config {
    /// Reject settings the resolver cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rate_limit_window_secs == 0 {
            anyhow::bail!("IIN_RESOLVER_RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }
        if self.upstream_url.is_empty() {
            anyhow::bail!("IIN_RESOLVER_UPSTREAM_URL must not be empty");
        }
        Ok(())
    }

    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.upstream_url.clone(),
            timeout: Duration::from_millis(self.upstream_timeout_ms),
        }
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            write_back_capacity: self.write_back_capacity,
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_calls: self.rate_limit_max_calls,
            window: Duration::from_secs(self.rate_limit_window_secs),
            counter_key: DEFAULT_COUNTER_KEY.to_string(),
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            jitter: self.retry_jitter.clamp(0.0, 1.0),
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let upstream_url = std::env::var("IIN_RESOLVER_UPSTREAM_URL")
        .unwrap_or_else(|_| "https://lookup.binlist.net".to_string());

    let upstream_timeout_ms = std::env::var("IIN_RESOLVER_UPSTREAM_TIMEOUT_MS")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()
        .unwrap_or(5000);

    // Issuer cache
    let cache_enabled = std::env::var("IIN_RESOLVER_CACHE_ENABLED")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(true);

    let cache_ttl_secs = std::env::var("IIN_RESOLVER_CACHE_TTL_SECS")
        .unwrap_or_else(|_| "86400".to_string())
        .parse()
        .unwrap_or(86400);

    let write_back_capacity = std::env::var("IIN_RESOLVER_WRITE_BACK_CAPACITY")
        .unwrap_or_else(|_| "1024".to_string())
        .parse()
        .unwrap_or(1024);

    let store_sweep_secs = std::env::var("IIN_RESOLVER_STORE_SWEEP_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .unwrap_or(30);

    // Upstream call budget
    let rate_limit_max_calls = std::env::var("IIN_RESOLVER_RATE_LIMIT_MAX_CALLS")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);

    let rate_limit_window_secs = std::env::var("IIN_RESOLVER_RATE_LIMIT_WINDOW_SECS")
        .unwrap_or_else(|_| "60".to_string())
        .parse()
        .unwrap_or(60);

    // Retry policy
    let retry_max_attempts = std::env::var("IIN_RESOLVER_RETRY_MAX_ATTEMPTS")
        .unwrap_or_else(|_| "3".to_string())
        .parse()
        .unwrap_or(3);

    let retry_base_delay_ms = std::env::var("IIN_RESOLVER_RETRY_BASE_DELAY_MS")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    let retry_jitter = std::env::var("IIN_RESOLVER_RETRY_JITTER")
        .unwrap_or_else(|_| "0.75".to_string())
        .parse()
        .unwrap_or(0.75);

    let debug = std::env::var("DEBUG").is_ok();

    let cfg = Config {
        upstream_url,
        upstream_timeout_ms,
        cache_enabled,
        cache_ttl_secs,
        write_back_capacity,
        store_sweep_secs,
        rate_limit_max_calls,
        rate_limit_window_secs,
        retry_max_attempts,
        retry_base_delay_ms,
        retry_jitter,
        debug,
    };
    cfg.validate()?;

    Ok(cfg)
}
