use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::rate_limit::RateLimit;
use crate::types::{duration_to_ticks, ticks_to_duration, TICKS_PER_SECOND};
use crate::{RateLimitError, RateLimitResult, Uint};

/// Smooth token-bucket rate limiter with forward reservations.
///
/// The limiter admits callers at a steady rate of `rate` permits per second.
/// Idle time is banked as *stored permits*, up to one second's worth
/// (`max_permits == rate`), so short bursts are absorbed immediately. Requests
/// that the bank cannot cover push a watermark (`next_free`) forward by
/// `interval` ticks per missing permit, and the caller sleeps until its share
/// of the watermark is reached.
///
/// # Algorithm Behavior
///
/// - Time is reconciled lazily: there is no background ticker. On every claim
///   the slack between the watermark and `now` is converted into stored permits.
/// - A claim first draws from the bank, then pays for the rest by advancing the
///   watermark. The returned wait is `next_free - now` after the advance.
/// - The internal lock serializes only this bookkeeping. Sleeping happens after
///   the lock is released, so waits of concurrent callers overlap in real time
///   while admission stays FIFO by arrival at the lock.
/// - The watermark never moves backwards. A pending reservation is never refunded.
///
/// # Time
///
/// Ticks are microseconds since the limiter was constructed, sampled from
/// [`Instant`], so wall-clock adjustments cannot corrupt computed waits. The
/// `_at` methods take the tick explicitly and never sleep, which makes the
/// accounting fully deterministic.
///
/// # Example
///
/// ```rust
/// use permit_pacer::RateLimiter;
/// use std::time::Duration;
///
/// let limiter = RateLimiter::new();
/// limiter.set_rate(2.0).unwrap();
///
/// // The bucket starts full: two permits are available right away.
/// assert!(limiter.try_acquire(2.0, Duration::ZERO));
/// // The third one would need half a second.
/// assert!(!limiter.try_acquire(1.0, Duration::ZERO));
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    /// Bit pattern of the configured rate, readable without taking the lock
    rate: AtomicU64,
    /// Instant that tick 0 corresponds to
    origin: Instant,
    /// Accounting state protected by mutex for thread safety
    state: Mutex<RateLimiterState>,
}

/// Internal accounting state of the limiter
#[derive(Debug, Clone, Copy, Default)]
struct RateLimiterState {
    /// Bucket capacity, always equal to the configured rate
    max_permits: f64,
    /// Ticks of forward time one permit costs at steady state
    interval: f64,
    /// Currently banked permits, within `0..=max_permits`
    stored_permits: f64,
    /// Tick at which the outstanding reservation debt reaches zero
    next_free: Uint,
}

impl RateLimiterState {
    #[inline(always)]
    fn admits(&self, permits: f64) -> bool {
        // NaN fails both comparisons
        permits >= 0.0 && permits <= self.max_permits
    }

    /// Banks the slack between the watermark and `now` as stored permits.
    ///
    /// No-op when `now <= next_free`.
    fn reconcile(&mut self, now: Uint) {
        if now > self.next_free {
            if self.interval > 0.0 {
                let accrued = (now - self.next_free) as f64 / self.interval;
                self.stored_permits = self.max_permits.min(self.stored_permits + accrued);
            }
            self.next_free = now;
        }
    }

    /// Reserves `permits` at `now` and returns the ticks the caller must wait.
    fn claim(&mut self, permits: f64, now: Uint) -> Uint {
        self.reconcile(now);

        let stored = permits.min(self.stored_permits);
        let fresh = permits - stored;

        // Rounded up so that a timeout equal to the wait always covers the fresh permits
        let cost = (fresh * self.interval).ceil() as Uint;
        self.next_free = self.next_free.saturating_add(cost);
        self.stored_permits -= stored;

        trace!(permits, stored, fresh, next_free = ?self.next_free, "claimed permits");
        self.next_free.saturating_sub(now)
    }

    fn reserve(&mut self, now: Uint, permits: f64) -> RateLimitResult<Uint> {
        if !self.admits(permits) {
            return Err(RateLimitError::InvalidPermits {
                permits,
                max_permits: self.max_permits,
            });
        }
        Ok(self.claim(permits, now))
    }

    /// Claims on a copy first and commits only when the wait fits in `timeout`,
    /// so a rejection leaves the state untouched.
    fn try_reserve(&mut self, now: Uint, permits: f64, timeout: Uint) -> Option<Uint> {
        if !self.admits(permits) {
            return None;
        }

        let mut preview = *self;
        let wait = preview.claim(permits, now);
        if wait > timeout {
            return None;
        }

        *self = preview;
        Some(wait)
    }
}

impl RateLimiter {
    /// Creates an unconfigured limiter.
    ///
    /// Until [`set_rate`](Self::set_rate) succeeds the bucket capacity is zero,
    /// so every request for a positive number of permits is rejected.
    pub fn new() -> Self {
        RateLimiter {
            rate: AtomicU64::new(0f64.to_bits()),
            origin: Instant::now(),
            state: Mutex::new(RateLimiterState::default()),
        }
    }

    /// Creates a limiter already configured for `rate` permits per second.
    ///
    /// # Example
    ///
    /// ```rust
    /// use permit_pacer::RateLimiter;
    ///
    /// let limiter = RateLimiter::with_rate(100.0).unwrap();
    /// assert_eq!(limiter.rate(), 100.0);
    /// assert!(RateLimiter::with_rate(0.0).is_err());
    /// ```
    pub fn with_rate(rate: f64) -> RateLimitResult<Self> {
        let limiter = Self::new();
        limiter.set_rate(rate)?;
        Ok(limiter)
    }

    /// Sets the steady-state rate in permits per second.
    ///
    /// The bucket capacity becomes `rate` and the bank is refilled to it. A
    /// watermark already pushed ahead under the previous rate is kept as is.
    ///
    /// # Returns
    /// * `Ok(())` - The rate was applied
    /// * `Err(RateLimitError::InvalidRate)` - `rate` is not a finite value above zero; nothing changed
    pub fn set_rate(&self, rate: f64) -> RateLimitResult {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(RateLimitError::InvalidRate { rate });
        }

        let mut state = self.lock();
        state.max_permits = rate;
        state.stored_permits = state.max_permits;
        state.interval = TICKS_PER_SECOND as f64 / rate;

        let previous = f64::from_bits(self.rate.swap(rate.to_bits(), Ordering::Relaxed));
        debug!(previous, rate, next_free = ?state.next_free, "rate limiter reconfigured");
        Ok(())
    }

    /// Returns the last configured rate, or `0.0` before the first configuration.
    ///
    /// Read without taking the lock: right after a concurrent
    /// [`set_rate`](Self::set_rate) this may still return the previous value.
    #[inline(always)]
    pub fn rate(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Relaxed))
    }

    /// Current tick: microseconds elapsed since this limiter was created.
    #[inline]
    pub fn now(&self) -> Uint {
        duration_to_ticks(self.origin.elapsed())
    }

    /// Acquires `permits`, blocking the current thread until they are available.
    ///
    /// The reservation is made under the lock; the sleep happens after it is
    /// released and always runs to completion.
    ///
    /// # Returns
    /// * `Ok(waited)` - How long the call slept (zero if the bank covered it)
    /// * `Err(RateLimitError::InvalidPermits)` - `permits` is negative or above capacity; nothing changed
    pub fn acquire(&self, permits: f64) -> RateLimitResult<Duration> {
        let wait = {
            let mut state = self.lock();
            let now = self.now();
            state.reserve(now, permits)?
        };

        let wait = ticks_to_duration(wait);
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        Ok(wait)
    }

    /// Acquires `permits` if they become available within `timeout`.
    ///
    /// Admissibility is checked once, under the lock: the call is admitted when
    /// the stored permits plus those accruing by `now + timeout` cover the
    /// request. A rejected call returns `false` at once, without waiting and
    /// without touching any state. An admitted call may sleep up to `timeout`.
    ///
    /// Invalid `permits` are reported as `false`, never as an error.
    pub fn try_acquire(&self, permits: f64, timeout: Duration) -> bool {
        let reserved = {
            let mut state = self.lock();
            let now = self.now();
            state.try_reserve(now, permits, duration_to_ticks(timeout))
        };

        match reserved {
            Some(wait) => {
                if wait > 0 {
                    thread::sleep(ticks_to_duration(wait));
                }
                true
            }
            None => {
                debug!(permits, ?timeout, "try_acquire rejected");
                false
            }
        }
    }

    /// Reserves `permits` at the given tick without sleeping.
    ///
    /// This is the bookkeeping half of [`acquire`](Self::acquire). Ticks earlier
    /// than the watermark are accepted; the wait simply grows accordingly.
    ///
    /// # Example
    ///
    /// ```rust
    /// use permit_pacer::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::with_rate(4.0).unwrap();
    /// assert_eq!(limiter.reserve_at(0, 4.0), Ok(Duration::ZERO));
    /// // One more permit costs a quarter of a second.
    /// assert_eq!(limiter.reserve_at(0, 1.0), Ok(Duration::from_millis(250)));
    /// ```
    pub fn reserve_at(&self, now: Uint, permits: f64) -> RateLimitResult<Duration> {
        let wait = self.lock().reserve(now, permits)?;
        Ok(ticks_to_duration(wait))
    }

    /// Reserves `permits` at the given tick if the wait fits within `timeout`.
    ///
    /// This is the bookkeeping half of [`try_acquire`](Self::try_acquire).
    ///
    /// # Returns
    /// * `Some(wait)` - Reserved; `wait <= timeout`
    /// * `None` - Rejected, or `permits` is invalid; nothing changed
    pub fn try_reserve_at(&self, now: Uint, permits: f64, timeout: Duration) -> Option<Duration> {
        self.lock()
            .try_reserve(now, permits, duration_to_ticks(timeout))
            .map(ticks_to_duration)
    }

    /// Permits that would be stored at the given tick, without changing any state.
    pub fn available_permits_at(&self, now: Uint) -> f64 {
        let mut preview = *self.lock();
        preview.reconcile(now);
        preview.stored_permits
    }

    /// Currently stored permits, as of the last reconciliation.
    #[inline]
    pub fn stored_permits(&self) -> f64 {
        self.lock().stored_permits
    }

    /// Bucket capacity. Equal to the configured rate.
    #[inline]
    pub fn max_permits(&self) -> f64 {
        self.lock().max_permits
    }

    /// Tick at which all outstanding reservations are paid off.
    #[inline]
    pub fn next_free(&self) -> Uint {
        self.lock().next_free
    }

    /// The state is plain numbers that no panic can leave half-written.
    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, RateLimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimit for RateLimiter {
    #[inline(always)]
    fn set_rate(&self, rate: f64) -> RateLimitResult {
        self.set_rate(rate)
    }

    #[inline(always)]
    fn rate(&self) -> f64 {
        self.rate()
    }

    #[inline(always)]
    fn acquire(&self, permits: f64) -> RateLimitResult<Duration> {
        self.acquire(permits)
    }

    #[inline(always)]
    fn try_acquire(&self, permits: f64, timeout: Duration) -> bool {
        self.try_acquire(permits, timeout)
    }
}

/// Configuration structure for creating a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateLimiterConfig {
    /// Steady-state rate, also the bucket capacity.
    pub permits_per_second: f64,
}

impl RateLimiterConfig {
    /// Creates a new configuration instance.
    pub fn new(permits_per_second: f64) -> Self {
        Self { permits_per_second }
    }
}

impl TryFrom<RateLimiterConfig> for RateLimiter {
    type Error = RateLimitError;

    /// Builds a configured limiter.
    ///
    /// ```
    /// use permit_pacer::{RateLimiter, RateLimiterConfig};
    ///
    /// let limiter = RateLimiter::try_from(RateLimiterConfig::new(50.0)).unwrap();
    /// assert_eq!(limiter.max_permits(), 50.0);
    /// ```
    fn try_from(config: RateLimiterConfig) -> Result<Self, Self::Error> {
        RateLimiter::with_rate(config.permits_per_second)
    }
}
