//! Infrastructure Layer
//!
//! Cross-cutting concerns and infrastructure components.

pub mod rate_limiter;
pub mod retry;
pub mod shutdown;

pub use rate_limiter::{FixedWindowRateLimiter, RateLimitConfig, RateLimitResult};
pub use retry::{RetryConfig, RetryPolicy};
pub use shutdown::{shutdown_signal, ShutdownController};
