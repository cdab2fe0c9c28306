//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the issuer lookup domain.
//! They have no external dependencies beyond serde.

use crate::domain::value_objects::{CountryCode, LookupKey};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Prefix of every cache entry key in the store.
pub const CACHE_KEY_PREFIX: &str = "iin-cache-";

/// Outcome of a successful resolve: the issuer key and its country.
///
/// Both fields are always populated; a lookup that cannot produce a
/// country is an error, never an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub lookup_key: LookupKey,
    pub country_code: CountryCode,
}

impl ResolutionResult {
    pub fn new(lookup_key: LookupKey, country_code: CountryCode) -> Self {
        Self {
            lookup_key,
            country_code,
        }
    }
}

/// Cached resolution as persisted in the key-value store.
///
/// The store evicts entries on TTL; `expire_at` lets readers reject an entry
/// the store has not swept yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub lookup_key: LookupKey,
    pub country_code: CountryCode,
    pub expire_at: SystemTime,
}

impl CacheEntry {
    /// Build an entry for a fresh result, expiring `ttl` from now.
    pub fn new(result: ResolutionResult, ttl: Duration) -> Self {
        Self {
            lookup_key: result.lookup_key,
            country_code: result.country_code,
            expire_at: SystemTime::now() + ttl,
        }
    }

    /// Store key under which the entry for `key` lives.
    pub fn store_key(key: &LookupKey) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, key)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= self.expire_at
    }

    pub fn into_result(self) -> ResolutionResult {
        ResolutionResult::new(self.lookup_key, self.country_code)
    }
}
