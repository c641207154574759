//! error.rs
//! Error and result types returned by the rate limiter.

use thiserror::Error;

/// Error type for rate limiter operations.
///
/// Both variants are raised synchronously, before any state is touched, and
/// carry the offending value for diagnostics. Retrying is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RateLimitError {
    /// The configured rate was zero, negative, or not finite.
    #[error("Invalid rate: expected a finite value greater than 0, got {rate}.")]
    InvalidRate {
        rate: f64,
    },
    /// The requested permits were negative, not a number, or above the bucket capacity.
    #[error("Invalid permits: tried to acquire {permits}, capacity is {max_permits}.")]
    InvalidPermits {
        permits: f64,
        max_permits: f64,
    },
}

/// Result type for rate limiter operations.
pub type RateLimitResult<T = ()> = Result<T, RateLimitError>;
