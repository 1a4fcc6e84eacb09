//! # Yieldtick Economics - Yield Rate & Merge Math
//!
//! Pure functions behind the accrual engine. Nothing in this crate touches a
//! clock or a store; callers pass `now` and the stake attributes in.
//!
//! ## Rate formula
//!
//! ```text
//! rate/s = balance × time_multiplier(days) × referral_boost(refs) × daily_ratio / 86 400
//! ```
//!
//! ## Time tiers
//!
//! | Stake-days | Multiplier |
//! |------------|------------|
//! | 0 – 7      | 1.00×      |
//! | 8 – 30     | 1.10×      |
//! | 31+        | 1.25×      |
//!
//! ## Referral boost
//!
//! +5% per referral, capped at +50%.

pub mod merge;
pub mod rate;
pub mod staking;

// Re-exports
pub use merge::{accrue, merge_accrued, merge_earnings};
pub use rate::{boosted_earning_rate, earning_rate, referral_boost, RateCalculator, RateFormula, TimeTier};
pub use staking::{is_unlocked, lock_end, staking_progress};

/// Yield constants
pub mod constants {
    /// Token symbol shown in notifications
    pub const SYMBOL: &str = "RZC";

    /// Default daily yield ratio (3.06% of stake per day)
    pub const DEFAULT_DAILY_RATIO: f64 = 0.0306;

    /// Referral boost per referred user
    pub const REFERRAL_BOOST_STEP: f64 = 0.05;

    /// Referral boost cap
    pub const MAX_REFERRAL_BOOST: f64 = 0.5;

    /// Last stake-day of the base tier
    pub const BASE_TIER_MAX_DAYS: u64 = 7;

    /// Last stake-day of the intermediate tier
    pub const MID_TIER_MAX_DAYS: u64 = 30;

    /// Staking lock period in days
    pub const LOCK_PERIOD_DAYS: u64 = 100;
}

pub use constants::*;
