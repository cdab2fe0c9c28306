//! Upstream Client Port
//!
//! Defines the outbound fetch against the issuer lookup provider.

use crate::domain::value_objects::LookupKey;
use async_trait::async_trait;

/// Raw answer from the issuer lookup provider.
///
/// Status classification and body parsing belong to the caller; the client
/// only moves bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// No HTTP response was received (connect failure, timeout, broken body).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Client for `GET {base_url}/{lookup_key}` on the issuer lookup provider.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch(&self, key: &LookupKey) -> Result<UpstreamResponse, TransportError>;
}
