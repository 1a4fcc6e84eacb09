//! # Offline Catch-up Handler
//!
//! Backgrounding snapshots the current rate and time; foregrounding consumes
//! the snapshot and credits what accrued in between.
//!
//! The credit window starts at the later of the snapshot time and the
//! state's `last_update`. Ticks that kept running in the background move
//! `last_update` forward and shrink the window, so no interval is paid twice.

use std::sync::Arc;
use yieldtick_core::error::Result;
use yieldtick_core::types::{elapsed_secs, AccrualState, OfflineSnapshot, UserId};
use yieldtick_economics::accrue;
use yieldtick_storage::LocalStore;

/// Catch-up credit owed at `now` for a consumed snapshot
pub fn catch_up_credit(snapshot: &OfflineSnapshot, last_update: i64, now: i64) -> f64 {
    let from = snapshot.last_active_timestamp.max(last_update);
    accrue(0.0, snapshot.base_earning_rate, elapsed_secs(from, now))
}

/// Visibility-driven snapshot/credit handler
pub struct OfflineCatchup {
    user: UserId,
    store: Arc<dyn LocalStore>,
    min_offline_ms: i64,
}

impl OfflineCatchup {
    pub fn new(user: UserId, store: Arc<dyn LocalStore>, min_offline_ms: u64) -> Self {
        Self {
            user,
            store,
            min_offline_ms: min_offline_ms as i64,
        }
    }

    /// Foreground → background: snapshot rate and time while accrual is active
    pub fn on_background(&self, state: &AccrualState, now: i64) -> Result<bool> {
        if !state.is_active {
            return Ok(false);
        }
        self.store.save_snapshot(
            &self.user,
            &OfflineSnapshot {
                last_active_timestamp: now,
                base_earning_rate: state.base_earning_rate,
            },
        )?;
        tracing::debug!(user = %self.user, rate = state.base_earning_rate, "offline snapshot saved");
        Ok(true)
    }

    /// Background → foreground: consume the snapshot and return the credit, if any
    ///
    /// A gap shorter than the configured minimum yields no credit; the next
    /// tick covers it through `last_update`.
    pub fn on_foreground(&self, state: &AccrualState, now: i64) -> Result<Option<f64>> {
        let Some(snapshot) = self.store.take_snapshot(&self.user)? else {
            return Ok(None);
        };
        if !state.is_active {
            return Ok(None);
        }
        if now - snapshot.last_active_timestamp < self.min_offline_ms {
            tracing::debug!(user = %self.user, "background gap below minimum, left to tick");
            return Ok(None);
        }

        let credit = catch_up_credit(&snapshot, state.last_update, now);
        if credit > 0.0 {
            tracing::info!(user = %self.user, credit, "offline earnings credited");
            Ok(Some(credit))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yieldtick_storage::MemoryStore;

    fn handler(min_offline_ms: u64) -> OfflineCatchup {
        OfflineCatchup::new(UserId::new("u"), Arc::new(MemoryStore::new()), min_offline_ms)
    }

    #[test]
    fn test_credit_once() {
        let offline = handler(0);
        let state = AccrualState::new_epoch(1_000, 0.0, 0.5, true);

        assert!(offline.on_background(&state, 1_000).unwrap());
        let credit = offline.on_foreground(&state, 11_000).unwrap();
        assert_eq!(credit, Some(5.0));

        assert_eq!(offline.on_foreground(&state, 20_000).unwrap(), None);
    }

    #[test]
    fn test_background_ticks_shrink_credit() {
        let snapshot = OfflineSnapshot {
            last_active_timestamp: 0,
            base_earning_rate: 1.0,
        };
        assert_eq!(catch_up_credit(&snapshot, 0, 10_000), 10.0);
        assert_eq!(catch_up_credit(&snapshot, 8_000, 10_000), 2.0);
        assert_eq!(catch_up_credit(&snapshot, 10_000, 10_000), 0.0);
    }

    #[test]
    fn test_inactive_state_skips_snapshot() {
        let offline = handler(0);
        let state = AccrualState::new_epoch(0, 0.0, 0.0, false);
        assert!(!offline.on_background(&state, 0).unwrap());
        assert_eq!(offline.on_foreground(&state, 50_000).unwrap(), None);
    }

    #[test]
    fn test_short_gap_below_minimum() {
        let offline = handler(5 * 60 * 1_000);
        let state = AccrualState::new_epoch(0, 0.0, 1.0, true);

        offline.on_background(&state, 0).unwrap();
        assert_eq!(offline.on_foreground(&state, 60_000).unwrap(), None);
    }
}
