//! # Staking Lock Period
//!
//! A deposit is locked for a fixed period starting at the last deposit date.
//! Progress is reported as a percentage for display.

use crate::constants::LOCK_PERIOD_DAYS;
use yieldtick_core::types::MILLIS_PER_DAY;

/// Default lock period in milliseconds
pub const DEFAULT_LOCK_PERIOD_MS: i64 = LOCK_PERIOD_DAYS as i64 * MILLIS_PER_DAY;

/// End of the lock that started at `deposit_date`
pub fn lock_end(deposit_date: i64, lock_period_ms: i64) -> i64 {
    deposit_date.saturating_add(lock_period_ms)
}

/// Percentage of the lock period elapsed, in `[0, 100]`
pub fn staking_progress(deposit_date: Option<i64>, now: i64, lock_period_ms: i64) -> f64 {
    let Some(start) = deposit_date else {
        return 0.0;
    };
    let end = lock_end(start, lock_period_ms);

    if now >= end {
        return 100.0;
    }
    if now <= start {
        return 0.0;
    }

    let progress = (now - start) as f64 / (end - start) as f64 * 100.0;
    progress.clamp(0.0, 100.0)
}

/// Whether the lock has elapsed
pub fn is_unlocked(deposit_date: Option<i64>, now: i64, lock_period_ms: i64) -> bool {
    match deposit_date {
        Some(start) => now >= lock_end(start, lock_period_ms),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bounds() {
        let lock = 100 * MILLIS_PER_DAY;
        assert_eq!(staking_progress(None, 5, lock), 0.0);
        assert_eq!(staking_progress(Some(1_000), 500, lock), 0.0);
        assert_eq!(staking_progress(Some(0), lock, lock), 100.0);
        assert_eq!(staking_progress(Some(0), lock * 3, lock), 100.0);
    }

    #[test]
    fn test_progress_linear() {
        let lock = 100 * MILLIS_PER_DAY;
        let progress = staking_progress(Some(0), 25 * MILLIS_PER_DAY, lock);
        assert!((progress - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_unlock() {
        assert!(!is_unlocked(None, i64::MAX, DEFAULT_LOCK_PERIOD_MS));
        assert!(!is_unlocked(Some(0), DEFAULT_LOCK_PERIOD_MS - 1, DEFAULT_LOCK_PERIOD_MS));
        assert!(is_unlocked(Some(0), DEFAULT_LOCK_PERIOD_MS, DEFAULT_LOCK_PERIOD_MS));
    }
}
