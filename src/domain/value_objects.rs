//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are validated on construction and can be freely shared.

use crate::domain::errors::ResolveError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer Identification Number prefix used as the lookup key.
///
/// Always 6 or 8 ASCII digits. Card numbers sharing the same leading
/// 8 digits (or 6, for shorter numbers) map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LookupKey(String);

impl LookupKey {
    /// Key length used for card numbers shorter than [`Self::LONG_LEN`].
    pub const SHORT_LEN: usize = 6;
    /// Key length used whenever the card number is long enough.
    pub const LONG_LEN: usize = 8;

    /// Derive the lookup key from a raw card number.
    ///
    /// The input must be digits only; surrounding whitespace is not stripped.
    ///
    /// # Examples
    /// ```
    /// use iin_resolver::LookupKey;
    ///
    /// assert_eq!(LookupKey::extract("378282246310005").unwrap().as_str(), "37828224");
    /// assert_eq!(LookupKey::extract("4571736").unwrap().as_str(), "457173");
    /// assert!(LookupKey::extract("123").is_err());
    /// ```
    pub fn extract(identifier: &str) -> Result<Self, ResolveError> {
        if identifier.is_empty() {
            return Err(ResolveError::invalid("card number cannot be empty"));
        }
        if !identifier.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ResolveError::invalid("card number must contain digits only"));
        }

        let len = if identifier.len() >= Self::LONG_LEN {
            Self::LONG_LEN
        } else if identifier.len() >= Self::SHORT_LEN {
            Self::SHORT_LEN
        } else {
            return Err(ResolveError::invalid(format!(
                "card number must be at least {} digits",
                Self::SHORT_LEN
            )));
        };

        // All bytes are ASCII digits, so slicing by byte index is safe.
        Ok(Self(identifier[..len].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LookupKey {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let well_formed = (value.len() == Self::SHORT_LEN || value.len() == Self::LONG_LEN)
            && value.bytes().all(|b| b.is_ascii_digit());
        if well_formed {
            Ok(Self(value))
        } else {
            Err(ResolveError::invalid(format!("malformed lookup key: {}", value)))
        }
    }
}

impl From<LookupKey> for String {
    fn from(key: LookupKey) -> Self {
        key.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issuing country (ISO 3166-1 alpha-2, upper case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a two-letter country code, normalising it to upper case.
    ///
    /// Returns None for anything that is not exactly two ASCII letters.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() == 2 && s.bytes().all(|b| b.is_ascii_alphabetic()) {
            Some(Self(s.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("malformed country code: {}", value))
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
