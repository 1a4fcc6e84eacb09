//! # Claim Cooldown Gate
//!
//! `Idle → Cooling(unlock_at) → Idle`
//!
//! The unlock time is persisted as an absolute epoch. Every decision, and the
//! displayed countdown, is derived from that epoch and the current time, so
//! background time and stalled timers neither extend nor shorten the window.
//! On foreground the epoch is reloaded from the store.

use std::sync::Arc;
use yieldtick_core::error::{AccrualError, Result};
use yieldtick_core::types::{CooldownMarker, UserId};
use yieldtick_storage::LocalStore;

/// Gate state after an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownStatus {
    /// Claiming allowed
    Idle,
    /// Seconds left before claiming is allowed
    Cooling(u64),
    /// Cooldown ended with this event
    Expired,
}

/// Claim cooldown state machine
pub struct ClaimCooldownGate {
    user: UserId,
    store: Arc<dyn LocalStore>,
    window_secs: u64,

    /// Unix seconds at which the running cooldown ends
    unlock_at: Option<i64>,

    /// Display value, refreshed from `unlock_at`
    remaining: u64,
}

impl ClaimCooldownGate {
    /// Create the gate and pick up any cooldown persisted by an earlier session
    pub fn restore(user: UserId, store: Arc<dyn LocalStore>, window_secs: u64, now_secs: i64) -> Self {
        let mut gate = Self {
            user,
            store,
            window_secs,
            unlock_at: None,
            remaining: 0,
        };
        gate.reload();
        gate.settle(now_secs);
        gate
    }

    /// Seconds left, as displayed
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_cooling(&self) -> bool {
        self.remaining > 0
    }

    /// Enter `Cooling`, failing if a cooldown is still running at `now_secs`
    pub fn begin(&mut self, now_secs: i64) -> Result<CooldownMarker> {
        if let CooldownStatus::Cooling(remaining_secs) = self.settle(now_secs) {
            return Err(AccrualError::ClaimCooling { remaining_secs });
        }

        let marker = CooldownMarker {
            unlock_at: now_secs + self.window_secs as i64,
        };
        self.store.save_cooldown(&self.user, marker)?;
        self.unlock_at = Some(marker.unlock_at);
        self.remaining = marker.remaining_secs(now_secs);

        tracing::debug!(user = %self.user, unlock_at = marker.unlock_at, "claim cooldown started");
        Ok(marker)
    }

    /// 1 Hz countdown step
    ///
    /// Recomputed from the unlock epoch; a late step never extends the cooldown.
    pub fn countdown(&mut self, now_secs: i64) -> CooldownStatus {
        self.settle(now_secs)
    }

    /// Recompute from the persisted epoch after returning to the foreground
    pub fn on_foreground(&mut self, now_secs: i64) -> CooldownStatus {
        self.reload();
        self.settle(now_secs)
    }

    fn reload(&mut self) {
        match self.store.load_cooldown(&self.user) {
            Ok(marker) => self.unlock_at = marker.map(|m| m.unlock_at),
            Err(e) => {
                tracing::error!(user = %self.user, error = %e, "failed to read cooldown marker");
            }
        }
    }

    fn settle(&mut self, now_secs: i64) -> CooldownStatus {
        let Some(unlock_at) = self.unlock_at else {
            self.remaining = 0;
            return CooldownStatus::Idle;
        };

        let marker = CooldownMarker { unlock_at };
        if marker.is_expired(now_secs) {
            self.unlock_at = None;
            self.remaining = 0;
            self.clear_marker();
            tracing::debug!(user = %self.user, "claim cooldown ended");
            CooldownStatus::Expired
        } else {
            self.remaining = marker.remaining_secs(now_secs);
            CooldownStatus::Cooling(self.remaining)
        }
    }

    fn clear_marker(&self) {
        if let Err(e) = self.store.clear_cooldown(&self.user) {
            tracing::error!(user = %self.user, error = %e, "failed to clear cooldown marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yieldtick_storage::MemoryStore;

    fn gate(store: Arc<MemoryStore>, now_secs: i64) -> ClaimCooldownGate {
        ClaimCooldownGate::restore(UserId::new("u"), store, 1_800, now_secs)
    }

    #[test]
    fn test_begin_and_reject() {
        let store = Arc::new(MemoryStore::new());
        let mut gate = gate(store.clone(), 100);

        let marker = gate.begin(100).unwrap();
        assert_eq!(marker.unlock_at, 1_900);
        assert_eq!(gate.remaining(), 1_800);

        let err = gate.begin(101).unwrap_err();
        assert_eq!(err, AccrualError::ClaimCooling { remaining_secs: 1_799 });
    }

    #[test]
    fn test_countdown_to_expiry() {
        let store = Arc::new(MemoryStore::new());
        let mut gate = ClaimCooldownGate::restore(UserId::new("u"), store.clone(), 3, 0);
        gate.begin(0).unwrap();

        assert_eq!(gate.countdown(1), CooldownStatus::Cooling(2));
        assert_eq!(gate.countdown(2), CooldownStatus::Cooling(1));
        assert_eq!(gate.countdown(3), CooldownStatus::Expired);
        assert_eq!(gate.countdown(4), CooldownStatus::Idle);
        assert_eq!(store.load_cooldown(&UserId::new("u")).unwrap(), None);
    }

    #[test]
    fn test_foreground_uses_persisted_epoch() {
        let store = Arc::new(MemoryStore::new());
        let mut gate = gate(store, 0);
        gate.begin(0).unwrap();

        // countdown ran only twice while two hours passed in the background
        gate.countdown(1);
        gate.countdown(2);
        assert_eq!(gate.on_foreground(600), CooldownStatus::Cooling(1_200));
        assert_eq!(gate.on_foreground(7_200), CooldownStatus::Expired);
        assert_eq!(gate.remaining(), 0);
    }

    #[test]
    fn test_restore_from_earlier_session() {
        let store = Arc::new(MemoryStore::new());
        gate(store.clone(), 0).begin(0).unwrap();

        assert_eq!(gate(store.clone(), 1_000).remaining(), 800);

        let expired = gate(store.clone(), 5_000);
        assert_eq!(expired.remaining(), 0);
        assert_eq!(store.load_cooldown(&UserId::new("u")).unwrap(), None);
    }

    #[test]
    fn test_delayed_countdown_follows_epoch() {
        let store = Arc::new(MemoryStore::new());
        let mut gate = gate(store.clone(), 0);
        gate.begin(0).unwrap();

        // one step after an hour without any
        assert_eq!(gate.countdown(3_600), CooldownStatus::Expired);
        assert_eq!(gate.remaining(), 0);
        assert_eq!(store.load_cooldown(&UserId::new("u")).unwrap(), None);

        let marker = gate.begin(3_600).unwrap();
        assert_eq!(marker.unlock_at, 5_400);
    }

    #[test]
    fn test_begin_after_unlock_without_countdown() {
        let store = Arc::new(MemoryStore::new());
        let mut gate = gate(store, 0);
        gate.begin(0).unwrap();

        assert_eq!(gate.remaining(), 1_800);
        assert!(gate.begin(1_800).is_ok());
    }
}
