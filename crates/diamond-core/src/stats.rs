//! Integer statistics over inter-arrival intervals.
//!
//! Both the detector and the cluster scorer judge buy cadence the same way:
//! sort the timestamps, take consecutive differences, then test the mean and
//! the coefficient of variation. All comparisons are exact integer maths on
//! running sums, so no floating-point rounding can flip a verdict.

/// Running sums over a sequence of non-negative intervals (milliseconds).
///
/// # Invariants
///
/// * `sum == intervals.iter().sum()`
/// * `sum_squares == intervals.iter().map(|v| v * v).sum()`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalStats {
    count: u64,
    sum: u128,
    sum_squares: u128,
}

impl IntervalStats {
    /// Build statistics from unordered timestamps. Sorts a copy first.
    ///
    /// # Examples
    ///
    /// ```
    /// use diamond_core::stats::IntervalStats;
    /// let s = IntervalStats::from_timestamps(&[3_000, 1_000, 2_000]);
    /// assert_eq!(s.count(), 2);
    /// assert_eq!(s.mean_ms(), 1_000);
    /// assert_eq!(s.stddev_ms(), 0);
    /// ```
    pub fn from_timestamps(timestamps: &[i64]) -> Self {
        let mut sorted = timestamps.to_vec();
        sorted.sort_unstable();

        let mut stats = Self::default();
        for pair in sorted.windows(2) {
            stats.push(pair[1].saturating_sub(pair[0]).max(0) as u64);
        }
        stats
    }

    pub fn push(&mut self, interval_ms: u64) {
        let v = interval_ms as u128;
        self.count += 1;
        self.sum = self.sum.saturating_add(v);
        self.sum_squares = self.sum_squares.saturating_add(v.saturating_mul(v));
    }

    /// Number of intervals.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Floor of the mean interval. `0` when empty.
    pub fn mean_ms(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        (self.sum / self.count as u128).min(u64::MAX as u128) as u64
    }

    /// Floor of the population standard deviation. `0` when empty.
    pub fn stddev_ms(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        let n = self.count as u128;
        // n^2 * variance = n * sum_squares - sum^2
        let scaled = n
            .saturating_mul(self.sum_squares)
            .saturating_sub(self.sum.saturating_mul(self.sum));
        let variance = scaled / n.saturating_mul(n);
        isqrt(variance.min(u64::MAX as u128) as u64)
    }

    /// `true` when the mean interval is strictly below `limit_ms`.
    ///
    /// Empty statistics have no mean and never qualify.
    pub fn mean_below(&self, limit_ms: u64) -> bool {
        self.count > 0 && self.sum < (limit_ms as u128).saturating_mul(self.count as u128)
    }

    /// `true` when the standard deviation is strictly below `pct` percent of
    /// the mean.
    ///
    /// Evaluated exactly as `10_000 * (n·Σx² − (Σx)²) < pct² · (Σx)²`.
    /// A zero mean never qualifies.
    pub fn stddev_below_pct_of_mean(&self, pct: u64) -> bool {
        if self.count == 0 || self.sum == 0 {
            return false;
        }
        let n = self.count as u128;
        let sum_sq = self.sum.saturating_mul(self.sum);
        let spread = n.saturating_mul(self.sum_squares).saturating_sub(sum_sq);
        let pct = pct as u128;
        spread.saturating_mul(10_000) < pct.saturating_mul(pct).saturating_mul(sum_sq)
    }
}

/// `true` when `value` is within `pct` percent of `reference`.
///
/// # Examples
///
/// ```
/// use diamond_core::stats::within_pct;
/// assert!(within_pct(105, 100, 5));
/// assert!(!within_pct(106, 100, 5));
/// assert!(within_pct(95, 100, 5));
/// ```
pub fn within_pct(value: u64, reference: u64, pct: u64) -> bool {
    let diff = value.abs_diff(reference) as u128;
    diff * 100 <= reference as u128 * pct as u128
}

/// Integer square root by Newton's method: `r*r <= n < (r+1)*(r+1)`.
pub fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = x.div_ceil(2);
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_has_no_mean() {
        let s = IntervalStats::default();
        assert_eq!(s.mean_ms(), 0);
        assert_eq!(s.stddev_ms(), 0);
        assert!(!s.mean_below(60_000));
        assert!(!s.stddev_below_pct_of_mean(10));
    }

    #[test]
    fn single_timestamp_yields_no_intervals() {
        assert_eq!(IntervalStats::from_timestamps(&[5]).count(), 0);
    }

    #[test]
    fn known_stddev() {
        // intervals 0 and 200: mean 100, variance 10_000, stddev 100
        let mut s = IntervalStats::default();
        s.push(0);
        s.push(200);
        assert_eq!(s.mean_ms(), 100);
        assert_eq!(s.stddev_ms(), 100);
    }

    #[test]
    fn regular_cadence_qualifies() {
        let ts: Vec<i64> = (0..6).map(|i| i * 10_000).collect();
        let s = IntervalStats::from_timestamps(&ts);
        assert!(s.mean_below(60_000));
        assert!(s.stddev_below_pct_of_mean(10));
    }

    #[test]
    fn irregular_cadence_does_not_qualify() {
        let s = IntervalStats::from_timestamps(&[0, 1_000, 30_000, 31_000, 90_000]);
        assert!(!s.stddev_below_pct_of_mean(10));
    }

    #[test]
    fn cv_boundary_is_strict() {
        // intervals 90 and 110: mean 100, stddev exactly 10 (10%)
        let mut s = IntervalStats::default();
        s.push(90);
        s.push(110);
        assert!(!s.stddev_below_pct_of_mean(10));
        assert!(s.stddev_below_pct_of_mean(11));
    }

    #[test]
    fn mean_boundary_is_strict() {
        let s = IntervalStats::from_timestamps(&[0, 60_000]);
        assert!(!s.mean_below(60_000));
        assert!(s.mean_below(60_001));
    }

    #[test]
    fn zero_mean_never_regular() {
        let s = IntervalStats::from_timestamps(&[7, 7, 7, 7]);
        assert_eq!(s.count(), 3);
        assert!(s.mean_below(60_000));
        assert!(!s.stddev_below_pct_of_mean(10));
    }

    #[test]
    fn within_pct_zero_reference() {
        assert!(within_pct(0, 0, 5));
        assert!(!within_pct(1, 0, 5));
    }

    #[test]
    fn isqrt_small_values() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u64::MAX), 4_294_967_295);
    }

    proptest! {
        #[test]
        fn isqrt_bounds(n in 0u64..=u64::MAX / 2) {
            let r = isqrt(n) as u128;
            prop_assert!(r * r <= n as u128);
            prop_assert!((r + 1) * (r + 1) > n as u128);
        }

        #[test]
        fn interval_count_is_len_minus_one(ts in proptest::collection::vec(0i64..1_000_000, 1..40)) {
            prop_assert_eq!(IntervalStats::from_timestamps(&ts).count(), ts.len() as u64 - 1);
        }
    }
}
