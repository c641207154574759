//! A smooth token-bucket rate limiter for throttling concurrent callers.
//!
//! [`RateLimiter`] caps how often an operation may run, at a steady rate given
//! in permits per second. Permit accounting is continuous: idle time is banked
//! lazily when a permit is requested, and demand beyond the bank is paid for by
//! pushing a reservation watermark forward. No background task is involved.
//!
//! # Quick Start
//!
//! ```rust
//! use permit_pacer::RateLimiter;
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let limiter = Arc::new(RateLimiter::with_rate(1_000.0).unwrap());
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let limiter = Arc::clone(&limiter);
//!         thread::spawn(move || {
//!             // Blocks until the permit is available.
//!             limiter.acquire(1.0).unwrap();
//!         })
//!     })
//!     .collect();
//! for worker in workers {
//!     worker.join().unwrap();
//! }
//!
//! // Bounded wait: gives up at once if 10 permits can't be had within 5 ms.
//! let _admitted = limiter.try_acquire(10.0, Duration::from_millis(5));
//! ```
//!
//! # Core Concepts
//!
//! ## Stored and fresh permits
//! The bucket holds at most one second's worth of permits (`max_permits == rate`).
//! A request draws from the stored permits first; the remainder ("fresh"
//! permits) costs `1_000_000 / rate` microseconds of forward time each.
//!
//! ## Time Representation
//! Time is measured in ticks of one microsecond on a monotonic timeline that
//! starts when the limiter is created (see [`RateLimiter::now`]). The `_at`
//! methods accept the tick explicitly and never sleep.
//!
//! ## Error Handling
//! Fallible operations return [`RateLimitResult`]:
//! - **[`InvalidRate`](RateLimitError::InvalidRate)** - a rate that is not a finite value above zero
//! - **[`InvalidPermits`](RateLimitError::InvalidPermits)** - negative permits, or more than the capacity
//!
//! [`RateLimiter::try_acquire`] never errors; it reports invalid input as `false`.
//!
//! ## Thread Safety
//! One mutex serializes the accounting. Callers sleep after releasing it, so
//! concurrently reserved waits overlap.

pub mod error;
pub mod rate_limit;
pub mod rate_limiter;
pub mod types;

pub use error::{RateLimitError, RateLimitResult};
pub use rate_limit::RateLimit;
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use types::{Uint, TICKS_PER_SECOND};
