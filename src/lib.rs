//! iin-resolver Library
//!
//! Resolves the issuing country of a payment card from its Issuer
//! Identification Number, with a rate-limited remote lookup behind a
//! cache-aside decorator.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{CacheAsideResolver, CacheConfig, RemoteResolver, WriteBack};
pub use config::load_config;
pub use domain::entities::{CacheEntry, ResolutionResult};
pub use domain::errors::{ResolveError, StoreError};
pub use domain::ports::{KeyValueStore, Resolver, UpstreamClient};
pub use domain::value_objects::{CountryCode, LookupKey};
