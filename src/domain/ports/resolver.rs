//! Resolver Port
//!
//! The single capability the rest of the application consumes.

use crate::domain::entities::ResolutionResult;
use crate::domain::errors::ResolveError;
use async_trait::async_trait;

/// Resolves a card number to its issuer key and issuing country.
///
/// Implementations compose by wrapping one another: the cache-aside
/// resolver decorates the remote resolver behind this same trait.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<ResolutionResult, ResolveError>;
}
