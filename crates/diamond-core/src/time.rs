//! Wall-clock access and pure duration derivations.
//!
//! Hold durations are never stored. Every read site derives them from
//! `(now, first_buy_at)` through [`hold_duration_days`].

use std::sync::atomic::{AtomicI64, Ordering};

use crate::constants::{MS_PER_DAY, MS_PER_HOUR};

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Reads the system clock through `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Whole days elapsed between `first_buy_at` and `now`.
///
/// `floor((now - first_buy_at) / 86_400_000)`, saturating at 0 when
/// `now` precedes `first_buy_at`.
///
/// # Examples
///
/// ```
/// use diamond_core::time::hold_duration_days;
/// assert_eq!(hold_duration_days(0, 86_400_000 * 3 - 1), 2);
/// assert_eq!(hold_duration_days(0, 86_400_000 * 3), 3);
/// assert_eq!(hold_duration_days(10, 0), 0);
/// ```
pub fn hold_duration_days(first_buy_at: i64, now: i64) -> u64 {
    elapsed_ms(first_buy_at, now) / MS_PER_DAY as u64
}

/// Whole hours elapsed between `since` and `now`, saturating at 0.
pub fn elapsed_hours(since: i64, now: i64) -> u64 {
    elapsed_ms(since, now) / MS_PER_HOUR as u64
}

/// Milliseconds elapsed between `since` and `now`, saturating at 0.
pub fn elapsed_ms(since: i64, now: i64) -> u64 {
    now.saturating_sub(since).max(0) as u64
}

/// Convert whole days to milliseconds, saturating.
pub fn days_to_ms(days: u64) -> i64 {
    (days as i64).saturating_mul(MS_PER_DAY)
}

/// Convert whole hours to milliseconds, saturating.
pub fn hours_to_ms(hours: u64) -> i64 {
    (hours as i64).saturating_mul(MS_PER_HOUR)
}
