//! Core type definitions for Yieldtick
//!
//! Timestamps are millisecond Unix epochs (`i64`) everywhere on the device
//! side. The remote record carries `chrono` timestamps because the record
//! store speaks ISO-8601.

use crate::error::{AccrualError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds in one second
pub const MILLIS_PER_SECOND: i64 = 1_000;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * MILLIS_PER_SECOND;

/// Seconds in one day, used to turn a daily ratio into a per-second rate
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// UserId - identity of the account whose balance accrues
///
/// Opaque to the engine. Every per-user record (local or remote) is keyed by it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Per-user running accrual, owned by the session that created it
///
/// Serialized with the same camelCase keys the device cache has always used,
/// so caches written by older clients still load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualState {
    /// Last time `current_earnings` was extrapolated or merged (ms)
    pub last_update: i64,

    /// Running total as last known to this device
    pub current_earnings: f64,

    /// Earnings per second applied to the next elapsed interval
    pub base_earning_rate: f64,

    /// Whether accrual advances (false when the stake is zero)
    pub is_active: bool,

    /// Start of the current accrual epoch (ms)
    pub start_date: i64,
}

impl AccrualState {
    /// Fresh state for a new accrual epoch starting at `now`
    pub fn new_epoch(now: i64, current_earnings: f64, base_earning_rate: f64, is_active: bool) -> Self {
        Self {
            last_update: now,
            current_earnings,
            base_earning_rate,
            is_active,
            start_date: now,
        }
    }

    /// Whole days elapsed since the epoch began
    pub fn days_staked(&self, now: i64) -> u64 {
        days_between(self.start_date, now)
    }
}

/// Whole days from `start` to `now`, zero if `now` precedes `start`
pub fn days_between(start: i64, now: i64) -> u64 {
    if now <= start {
        return 0;
    }
    ((now - start) / MILLIS_PER_DAY) as u64
}

/// Seconds from `earlier` to `later` as a real number, never negative
pub fn elapsed_secs(earlier: i64, later: i64) -> f64 {
    if later <= earlier {
        return 0.0;
    }
    (later - earlier) as f64 / MILLIS_PER_SECOND as f64
}

/// Rate/time captured when the app goes to the background
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSnapshot {
    /// When the app was backgrounded (ms)
    pub last_active_timestamp: i64,

    /// Rate in effect at that moment
    pub base_earning_rate: f64,
}

/// Absolute unlock time of the claim cooldown
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownMarker {
    /// Unix seconds at which claiming is allowed again
    pub unlock_at: i64,
}

impl CooldownMarker {
    /// Seconds left until unlock, zero once passed
    pub fn remaining_secs(&self, now_secs: i64) -> u64 {
        (self.unlock_at - now_secs).max(0) as u64
    }

    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.remaining_secs(now_secs) == 0
    }
}

/// Server-held accrual record, shared by every device of a user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccrualRecord {
    pub current_earnings: f64,
    pub last_update: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
}

impl RemoteAccrualRecord {
    pub fn last_update_ms(&self) -> i64 {
        self.last_update.timestamp_millis()
    }

    pub fn start_date_ms(&self) -> i64 {
        self.start_date.timestamp_millis()
    }
}

/// Payload of an insert-or-replace on the remote record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EarningsUpsert {
    pub current_earnings: f64,
    pub last_update: DateTime<Utc>,

    /// Left untouched on the server when `None`
    pub start_date: Option<DateTime<Utc>>,
}

impl EarningsUpsert {
    /// Build an upsert from device-side millisecond timestamps
    pub fn at(current_earnings: f64, last_update_ms: i64, start_date_ms: Option<i64>) -> Result<Self> {
        Ok(Self {
            current_earnings,
            last_update: datetime_from_millis(last_update_ms)?,
            start_date: start_date_ms.map(datetime_from_millis).transpose()?,
        })
    }
}

/// Convert a millisecond epoch into a UTC timestamp
pub fn datetime_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AccrualError::InvalidInput(format!("timestamp out of range: {}ms", ms)))
}

/// Stake attributes owned by the user profile, read-only to the engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StakeProfile {
    /// Principal balance
    pub balance: f64,

    /// Number of referred users
    pub referral_count: u32,

    /// Time of the last deposit (ms), start of the staking lock
    pub last_deposit_date: Option<i64>,
}

impl StakeProfile {
    pub fn new(balance: f64, referral_count: u32) -> Self {
        Self {
            balance,
            referral_count,
            last_deposit_date: None,
        }
    }

    pub fn with_deposit_date(mut self, deposit_date: i64) -> Self {
        self.last_deposit_date = Some(deposit_date);
        self
    }

    /// A stake accrues only with a positive, finite balance
    pub fn has_stake(&self) -> bool {
        self.balance.is_finite() && self.balance > 0.0
    }
}

/// Host application visibility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Foreground,
    Background,
}
