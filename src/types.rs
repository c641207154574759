//! Unsigned integer type alias for limiter ticks.
//!
//! A tick is one microsecond on the limiter's own monotonic timeline. The
//! actual integer type is chosen at compile time via feature flags.
//!
//! # Features
//! - `tick-u64` (default): uses [`u64`] as `Uint`
//! - `tick-u128`: uses [`u128`] as `Uint`
//!   (Both features cannot be enabled at the same time.)
//! - If neither feature is enabled, `u64` is used as the default type.

/// Alias for the unsigned integer type used for ticks (microseconds).
///
/// > **Note:** Enabling both `tick-u64` and `tick-u128` at the same time
///   will result in a compile error. If neither is enabled, [`u64`] is used.
#[cfg(all(feature = "tick-u64", feature = "tick-u128"))]
compile_error!("You cannot enable both `tick-u64` and `tick-u128` features at the same time");

#[cfg(all(feature = "tick-u64", not(feature = "tick-u128")))]
pub type Uint = u64;

#[cfg(all(feature = "tick-u128", not(feature = "tick-u64")))]
pub type Uint = u128;

#[cfg(not(any(feature = "tick-u64", feature = "tick-u128")))]
pub type Uint = u64;

/// Number of ticks in one second.
pub const TICKS_PER_SECOND: Uint = 1_000_000;

/// Converts a tick count into a [`Duration`](std::time::Duration).
#[inline]
pub(crate) fn ticks_to_duration(ticks: Uint) -> std::time::Duration {
    std::time::Duration::from_micros(u64::try_from(ticks).unwrap_or(u64::MAX))
}

/// Converts a [`Duration`](std::time::Duration) into ticks, saturating.
#[inline]
pub(crate) fn duration_to_ticks(duration: std::time::Duration) -> Uint {
    Uint::try_from(duration.as_micros()).unwrap_or(Uint::MAX)
}
