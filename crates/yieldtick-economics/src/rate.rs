//! # Rate Calculator
//!
//! Converts a stake into earnings per second.
//!
//! Two formulas exist. The simplified one ignores referrals (boost fixed at
//! 1.0); the richer one multiplies in the referral boost. Both apply the
//! stake-day time tier and divide the daily ratio down to a per-second rate.

use crate::constants::*;
use serde::{Deserialize, Serialize};
use yieldtick_core::types::{StakeProfile, SECONDS_PER_DAY};

/// Time tier reached by the number of whole stake-days
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeTier {
    /// Days 0-7: 1.0×
    Base,
    /// Days 8-30: 1.1×
    Seasoned,
    /// Day 31 onwards: 1.25×
    Veteran,
}

impl TimeTier {
    /// Tier for an elapsed number of stake-days (upper bounds inclusive)
    pub fn from_days(days_staked: u64) -> Self {
        if days_staked <= BASE_TIER_MAX_DAYS {
            Self::Base
        } else if days_staked <= MID_TIER_MAX_DAYS {
            Self::Seasoned
        } else {
            Self::Veteran
        }
    }

    /// Multiplier applied to the stake
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Seasoned => 1.1,
            Self::Veteran => 1.25,
        }
    }

    /// Get tier name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::Seasoned => "Seasoned",
            Self::Veteran => "Veteran",
        }
    }
}

/// `1 + min(referrals × 5%, 50%)`
pub fn referral_boost(referral_count: u32) -> f64 {
    1.0 + (referral_count as f64 * REFERRAL_BOOST_STEP).min(MAX_REFERRAL_BOOST)
}

/// Negative and non-finite inputs clamp to zero so NaN never reaches a running total
fn clamp_input(value: f64, what: &str) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::warn!(value, input = what, "invalid rate input clamped to zero");
        0.0
    }
}

/// Simplified rate: no referral boost
pub fn earning_rate(balance: f64, daily_ratio: f64, days_staked: u64) -> f64 {
    boosted_earning_rate(balance, daily_ratio, days_staked, 0)
}

/// Full rate including the referral boost
pub fn boosted_earning_rate(balance: f64, daily_ratio: f64, days_staked: u64, referral_count: u32) -> f64 {
    let balance = clamp_input(balance, "balance");
    let daily_ratio = clamp_input(daily_ratio, "daily_ratio");

    let effective_stake =
        balance * TimeTier::from_days(days_staked).multiplier() * referral_boost(referral_count);

    effective_stake * daily_ratio / SECONDS_PER_DAY
}

/// Which formula the calculator applies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateFormula {
    /// Referral boost fixed at 1.0
    #[default]
    Simple,
    /// Referral boost from the profile's referral count
    WithReferrals,
}

/// Rate calculator bound to a daily ratio and formula
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateCalculator {
    /// Fraction of the stake earned per day before multipliers
    pub daily_ratio: f64,

    pub formula: RateFormula,
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_RATIO)
    }
}

impl RateCalculator {
    /// Simplified-formula calculator
    pub fn new(daily_ratio: f64) -> Self {
        Self {
            daily_ratio,
            formula: RateFormula::Simple,
        }
    }

    pub fn with_formula(mut self, formula: RateFormula) -> Self {
        self.formula = formula;
        self
    }

    /// Earnings per second for a profile after `days_staked` whole days
    pub fn rate(&self, profile: &StakeProfile, days_staked: u64) -> f64 {
        let referrals = match self.formula {
            RateFormula::Simple => 0,
            RateFormula::WithReferrals => profile.referral_count,
        };
        boosted_earning_rate(profile.balance, self.daily_ratio, days_staked, referrals)
    }

    /// Earnings per day, for display
    pub fn daily_earnings(&self, profile: &StakeProfile, days_staked: u64) -> f64 {
        self.rate(profile, days_staked) * SECONDS_PER_DAY
    }
}
