//! Domain Errors
//!
//! Error taxonomy shared by every resolver. Status hints follow the mapping the
//! surrounding web layer applies when it turns a failure into a response.

/// Failure reported by a key-value store adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("value stored at {key} is not an integer")]
    NotAnInteger { key: String },
}

/// Failure of a resolve operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The card number is malformed. Never retried.
    #[error("invalid card number: {0}")]
    InvalidIdentifier(String),

    /// The local call budget for the upstream provider is spent.
    #[error("too many requests to the issuer lookup provider")]
    RateLimitExceeded,

    /// The upstream answered with a terminal status, kept retrying past the
    /// attempt cap, or returned a payload without a usable country.
    /// `status` is `None` when no HTTP response was received at all.
    #[error("issuer lookup failed ({}): {message}", status_label(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// The store backing the rate counter could not be reached.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no response".to_string(),
    }
}

impl ResolveError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier(reason.into())
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status the web layer should answer with.
    ///
    /// Upstream throttling (429) is reported as 503 because the caller is not
    /// at fault; an upstream 400 is passed through; anything else from the
    /// upstream is a bad gateway.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidIdentifier(_) => 400,
            Self::RateLimitExceeded => 503,
            Self::Upstream {
                status: Some(429), ..
            } => 503,
            Self::Upstream {
                status: Some(400), ..
            } => 400,
            Self::Upstream { .. } => 502,
            Self::Store(_) => 503,
        }
    }
}
