//! Domain Layer
//!
//! Value objects, entities, errors and the ports the application depends on.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod value_objects;

pub use entities::{CacheEntry, ResolutionResult};
pub use errors::{ResolveError, StoreError};
pub use value_objects::{CountryCode, LookupKey};
