//! iin-resolver - Card issuer country lookup
//!
//! This is the composition root that wires together all the components and
//! resolves the card numbers given on the command line.

use iin_resolver::adapters::outbound::{DashMapKeyValueStore, HttpUpstreamClient};
use iin_resolver::application::{CacheAsideResolver, RemoteResolver, WriteBack};
use iin_resolver::config::load_config;
use iin_resolver::domain::ports::{KeyValueStore, Resolver};
use iin_resolver::infrastructure::{
    shutdown_signal, FixedWindowRateLimiter, RetryPolicy, ShutdownController,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let card_numbers: Vec<String> = std::env::args().skip(1).collect();
    if card_numbers.is_empty() {
        anyhow::bail!("usage: iin-resolver <card-number>...");
    }

    tracing::info!(
        "starting iin-resolver upstream={} cache={}",
        cfg.upstream_url,
        cfg.cache_enabled
    );

    // ===== COMPOSITION ROOT =====

    // 1. Shared store for the rate counter and the issuer cache
    let store = Arc::new(DashMapKeyValueStore::new());
    store.start_sweeper(Duration::from_secs(cfg.store_sweep_secs.max(1)));
    let store: Arc<dyn KeyValueStore> = store;

    // 2. Remote resolver: rate limiter + upstream client + retry policy
    let upstream = Arc::new(HttpUpstreamClient::new(cfg.upstream())?);
    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(store.clone(), cfg.rate_limit()));
    let remote: Arc<dyn Resolver> = Arc::new(RemoteResolver::new(
        upstream,
        rate_limiter,
        RetryPolicy::new(cfg.retry()),
    ));

    // 3. Cache-aside decorator with its write-back pipeline
    let shutdown = ShutdownController::new();
    let (resolver, write_back_task) = if cfg.cache_enabled {
        let (write_back, task) = WriteBack::spawn(store.clone(), &cfg.cache(), shutdown.clone());
        let cached: Arc<dyn Resolver> =
            Arc::new(CacheAsideResolver::new(remote, store.clone(), write_back));
        tracing::info!("issuer cache enabled, ttl={}s", cfg.cache_ttl_secs);
        (cached, Some(task))
    } else {
        (remote, None)
    };

    tokio::spawn(shutdown_signal(shutdown.clone()));

    // 4. Resolve
    let mut failures = 0usize;
    for card_number in &card_numbers {
        let outcome = tokio::select! {
            outcome = resolver.resolve(card_number) => outcome,
            _ = shutdown.wait() => {
                tracing::info!("shutdown requested, skipping remaining card numbers");
                break;
            }
        };

        match outcome {
            Ok(result) => println!("{} {}", result.lookup_key, result.country_code),
            Err(e) => {
                tracing::error!("failed to resolve card (status {}): {}", e.http_status(), e);
                failures += 1;
            }
        }
    }

    // 5. Flush pending cache writes
    shutdown.shutdown();
    if let Some(task) = write_back_task {
        task.await?;
    }

    if failures > 0 {
        anyhow::bail!("{} of {} card numbers could not be resolved", failures, card_numbers.len());
    }

    Ok(())
}
