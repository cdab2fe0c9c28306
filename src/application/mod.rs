//! Application Layer
//!
//! The two resolver implementations: the remote lookup and the cache-aside
//! decorator in front of it.

mod cache_aside_resolver;
mod remote_resolver;

pub use cache_aside_resolver::{CacheAsideResolver, CacheConfig, WriteBack};
pub use remote_resolver::RemoteResolver;
