//! Core trait for rate limiters.
//!
//! This module defines the object-safe trait over the limiter's operations, so
//! callers can hold a `Box<dyn RateLimit>` or `Arc<dyn RateLimit>` and swap the
//! implementation (for example in tests) without touching call sites.

use std::time::Duration;

use crate::RateLimitResult;

/// The core trait implemented by rate limiters.
pub trait RateLimit: Send + Sync {
    /// Sets the steady-state rate in permits per second.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(RateLimitError::InvalidRate)` if `rate` is not a finite value above zero
    fn set_rate(&self, rate: f64) -> RateLimitResult;

    /// Returns the last configured rate.
    fn rate(&self) -> f64;

    /// Acquires `permits`, blocking until they are available.
    ///
    /// # Returns
    /// * `Ok(waited)` - How long the call slept
    /// * `Err(RateLimitError::InvalidPermits)` if `permits` is negative or above capacity
    fn acquire(&self, permits: f64) -> RateLimitResult<Duration>;

    /// Acquires `permits` if they become available within `timeout`.
    fn try_acquire(&self, permits: f64, timeout: Duration) -> bool;

    /// Acquires `permits` only if no waiting is needed.
    fn try_acquire_now(&self, permits: f64) -> bool {
        self.try_acquire(permits, Duration::ZERO)
    }
}
