//! Remote Resolver
//!
//! Resolves issuer countries against the upstream lookup provider, guarded by
//! the shared rate limiter and retried on transient failures.

use crate::domain::entities::ResolutionResult;
use crate::domain::errors::ResolveError;
use crate::domain::ports::{Resolver, UpstreamClient, UpstreamResponse};
use crate::domain::value_objects::{CountryCode, LookupKey};
use crate::infrastructure::rate_limiter::FixedWindowRateLimiter;
use crate::infrastructure::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Upstream payload; only the country code is of interest.
#[derive(Debug, Deserialize)]
struct LookupBody {
    country: Option<CountryBody>,
}

#[derive(Debug, Deserialize)]
struct CountryBody {
    alpha2: Option<String>,
}

/// Outcome of a single failed fetch attempt.
#[derive(Debug)]
enum FetchFailure {
    /// 5xx, 429 or no response at all; worth another attempt
    Transient(ResolveError),
    /// Any other failure; surfaced immediately
    Terminal(ResolveError),
}

impl FetchFailure {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    fn into_error(self) -> ResolveError {
        match self {
            Self::Transient(e) | Self::Terminal(e) => e,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(e) | Self::Terminal(e) => e.fmt(f),
        }
    }
}

/// Resolver backed by the upstream lookup provider.
///
/// One rate-limit permit is taken per resolve, before the first attempt;
/// retries of the same resolve do not take further permits. Attempts keep
/// running to success or exhaustion even if the caller drops the resolve.
pub struct RemoteResolver {
    upstream: Arc<dyn UpstreamClient>,
    rate_limiter: Arc<FixedWindowRateLimiter>,
    retry: RetryPolicy,
}

impl RemoteResolver {
    /// Create a new remote resolver.
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        rate_limiter: Arc<FixedWindowRateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            upstream,
            rate_limiter,
            retry,
        }
    }

    async fn fetch_country(
        upstream: &dyn UpstreamClient,
        key: &LookupKey,
    ) -> Result<CountryCode, FetchFailure> {
        let response = upstream.fetch(key).await.map_err(|e| {
            FetchFailure::Transient(ResolveError::upstream(None, e.to_string()))
        })?;

        Self::classify(response)
    }

    /// Map an upstream response to a country or a retry decision.
    fn classify(response: UpstreamResponse) -> Result<CountryCode, FetchFailure> {
        let status = response.status;

        if status == 429 || status >= 500 {
            return Err(FetchFailure::Transient(ResolveError::upstream(
                Some(status),
                "error getting card info from lookup provider",
            )));
        }
        if !(200..300).contains(&status) {
            return Err(FetchFailure::Terminal(ResolveError::upstream(
                Some(status),
                "lookup provider rejected the request",
            )));
        }

        let body: LookupBody = serde_json::from_str(&response.body).map_err(|e| {
            FetchFailure::Terminal(ResolveError::upstream(
                Some(status),
                format!("malformed lookup response: {}", e),
            ))
        })?;

        body.country
            .and_then(|c| c.alpha2)
            .as_deref()
            .and_then(CountryCode::parse)
            .ok_or_else(|| {
                FetchFailure::Terminal(ResolveError::upstream(
                    Some(status),
                    "lookup response has no usable country code",
                ))
            })
    }
}

#[async_trait]
impl Resolver for RemoteResolver {
    async fn resolve(&self, identifier: &str) -> Result<ResolutionResult, ResolveError> {
        let key = LookupKey::extract(identifier)?;

        self.rate_limiter.try_acquire().await?;

        // The attempts run on their own task so a caller that stops waiting
        // does not cut the retry sequence short.
        let upstream = self.upstream.clone();
        let retry = self.retry.clone();
        let fetch_key = key.clone();
        let attempts = tokio::spawn(async move {
            let client = upstream.as_ref();
            let key_ref = &fetch_key;
            retry
                .run(
                    move || Self::fetch_country(client, key_ref),
                    FetchFailure::is_transient,
                )
                .await
        });

        let country = attempts
            .await
            .map_err(|e| ResolveError::upstream(None, format!("lookup task failed: {}", e)))?
            .map_err(FetchFailure::into_error)?;

        tracing::info!("card info provided by lookup provider: {} -> {}", key, country);

        Ok(ResolutionResult::new(key, country))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::DashMapKeyValueStore;
    use crate::domain::ports::TransportError;
    use crate::infrastructure::rate_limiter::RateLimitConfig;
    use crate::infrastructure::retry::RetryConfig;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted responses and counts calls.
    struct ScriptedUpstream {
        script: Mutex<VecDeque<Result<UpstreamResponse, TransportError>>>,
        fallback: Result<UpstreamResponse, TransportError>,
        calls: AtomicUsize,
    }

    impl ScriptedUpstream {
        fn new(
            script: Vec<Result<UpstreamResponse, TransportError>>,
            fallback: Result<UpstreamResponse, TransportError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            })
        }

        fn always(response: UpstreamResponse) -> Arc<Self> {
            Self::new(Vec::new(), Ok(response))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamClient for ScriptedUpstream {
        async fn fetch(&self, _key: &LookupKey) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn ok_body(country: &str) -> UpstreamResponse {
        UpstreamResponse::new(
            200,
            serde_json::json!({
                "number": {},
                "scheme": "amex",
                "country": {"numeric": "840", "alpha2": country, "name": "United States of America"}
            })
            .to_string(),
        )
    }

    fn resolver_with(upstream: Arc<ScriptedUpstream>, max_calls: u64) -> RemoteResolver {
        resolver_with_retry(
            upstream,
            max_calls,
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                jitter: 0.75,
            },
        )
    }

    fn resolver_with_retry(
        upstream: Arc<ScriptedUpstream>,
        max_calls: u64,
        retry: RetryConfig,
    ) -> RemoteResolver {
        let limiter = FixedWindowRateLimiter::new(
            Arc::new(DashMapKeyValueStore::new()),
            RateLimitConfig {
                max_calls,
                window: Duration::from_secs(60),
                ..Default::default()
            },
        );
        RemoteResolver::new(
            upstream,
            Arc::new(limiter),
            RetryPolicy::new(retry),
        )
    }

    // ===== Success Tests =====

    #[tokio::test]
    async fn test_resolve_success() {
        let upstream = ScriptedUpstream::always(ok_body("US"));
        let resolver = resolver_with(upstream.clone(), 10);

        let result = resolver.resolve("378282246310005").await.unwrap();

        assert_eq!(result.lookup_key.as_str(), "37828224");
        assert_eq!(result.country_code.as_str(), "US");
        assert_eq!(upstream.calls(), 1);
    }

    // ===== Validation Tests =====

    #[tokio::test]
    async fn test_invalid_identifier_fails_before_any_call() {
        let upstream = ScriptedUpstream::always(ok_body("US"));
        let resolver = resolver_with(upstream.clone(), 10);

        for bad in ["", "123", "12345", "abcdefgh", " 4111111"] {
            let err = resolver.resolve(bad).await.unwrap_err();
            assert!(matches!(err, ResolveError::InvalidIdentifier(_)), "{:?}", bad);
        }
        assert_eq!(upstream.calls(), 0);
    }

    // ===== Rate Limit Tests =====

    #[tokio::test]
    async fn test_rate_limit_denies_without_upstream_call() {
        let upstream = ScriptedUpstream::always(ok_body("US"));
        let resolver = resolver_with(upstream.clone(), 1);

        assert!(resolver.resolve("378282246310005").await.is_ok());
        let err = resolver.resolve("4571736000000000").await.unwrap_err();

        assert_eq!(err, ResolveError::RateLimitExceeded);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_consume_a_single_permit() {
        let upstream = ScriptedUpstream::new(
            vec![Ok(UpstreamResponse::new(503, "")), Ok(UpstreamResponse::new(503, ""))],
            Ok(ok_body("US")),
        );
        let resolver = resolver_with(upstream.clone(), 1);

        assert!(resolver.resolve("378282246310005").await.is_ok());
        assert_eq!(upstream.calls(), 3);
    }

    // ===== Retry Tests =====

    #[tokio::test]
    async fn test_two_transient_failures_then_success() {
        let upstream = ScriptedUpstream::new(
            vec![Ok(UpstreamResponse::new(500, "")), Ok(UpstreamResponse::new(429, ""))],
            Ok(ok_body("DK")),
        );
        let resolver = resolver_with(upstream.clone(), 10);

        let result = resolver.resolve("4571736000000000").await.unwrap();

        assert_eq!(result.country_code.as_str(), "DK");
        assert_eq!(upstream.calls(), 3);
    }

    #[tokio::test]
    async fn test_always_transient_exhausts_at_three_attempts() {
        let upstream = ScriptedUpstream::always(UpstreamResponse::new(503, "down"));
        let resolver = resolver_with(upstream.clone(), 10);

        let err = resolver.resolve("4571736000000000").await.unwrap_err();

        assert!(matches!(err, ResolveError::Upstream { status: Some(503), .. }));
        assert_eq!(upstream.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let upstream = ScriptedUpstream::new(
            vec![Ok(UpstreamResponse::new(500, "")), Ok(UpstreamResponse::new(502, ""))],
            Ok(UpstreamResponse::new(429, "")),
        );
        let resolver = resolver_with(upstream, 10);

        let err = resolver.resolve("4571736000000000").await.unwrap_err();

        assert!(matches!(err, ResolveError::Upstream { status: Some(429), .. }));
        assert_eq!(err.http_status(), 503);
    }

    #[tokio::test]
    async fn test_transport_error_is_retried() {
        let upstream = ScriptedUpstream::new(
            vec![Err(TransportError("connection reset".into()))],
            Ok(ok_body("US")),
        );
        let resolver = resolver_with(upstream.clone(), 10);

        assert!(resolver.resolve("378282246310005").await.is_ok());
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_terminal() {
        let upstream = ScriptedUpstream::always(UpstreamResponse::new(404, ""));
        let resolver = resolver_with(upstream.clone(), 10);

        let err = resolver.resolve("378282246310005").await.unwrap_err();

        assert!(matches!(err, ResolveError::Upstream { status: Some(404), .. }));
        assert_eq!(err.http_status(), 502);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_resolve_keeps_retrying() {
        let upstream = ScriptedUpstream::always(UpstreamResponse::new(503, "down"));
        let resolver = resolver_with_retry(
            upstream.clone(),
            10,
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(50),
                jitter: 0.0,
            },
        );

        let outcome =
            tokio::time::timeout(Duration::from_millis(10), resolver.resolve("378282246310005"))
                .await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(upstream.calls(), 3);
    }

    // ===== Payload Tests =====

    #[tokio::test]
    async fn test_missing_country_is_upstream_error() {
        let upstream = ScriptedUpstream::always(UpstreamResponse::new(200, r#"{"scheme":"visa"}"#));
        let resolver = resolver_with(upstream.clone(), 10);

        let err = resolver.resolve("4571736000000000").await.unwrap_err();

        assert!(matches!(err, ResolveError::Upstream { status: Some(200), .. }));
        assert_eq!(upstream.calls(), 1);
    }

    #[test]
    fn test_classify_rejects_unusable_country() {
        for body in [
            r#"{"country":{}}"#,
            r#"{"country":{"alpha2":""}}"#,
            r#"{"country":{"alpha2":"USA"}}"#,
            r#"{"country":null}"#,
            "not json",
        ] {
            let result = RemoteResolver::classify(UpstreamResponse::new(200, body));
            assert!(matches!(result, Err(FetchFailure::Terminal(_))), "{}", body);
        }
    }

    #[test]
    fn test_classify_status_categories() {
        for status in [429, 500, 502, 503, 599] {
            let result = RemoteResolver::classify(UpstreamResponse::new(status, ""));
            assert!(result.unwrap_err().is_transient(), "{}", status);
        }
        for status in [301, 400, 401, 403, 404, 422] {
            let result = RemoteResolver::classify(UpstreamResponse::new(status, ""));
            assert!(!result.unwrap_err().is_transient(), "{}", status);
        }
    }
}
