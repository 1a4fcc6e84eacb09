//! Device-local persistence
//!
//! Records are grouped per user in a [`UserRecords`] struct instead of being
//! spread over string-concatenated keys.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use yieldtick_core::error::Result;
use yieldtick_core::types::{AccrualState, CooldownMarker, OfflineSnapshot, UserId};

/// Everything the device keeps for one user
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecords {
    /// Running accrual, rewritten every tick
    pub accrual: Option<AccrualState>,

    /// Last successful remote sync (ms)
    pub last_synced_at: Option<i64>,

    /// Present only while the app is backgrounded
    pub offline: Option<OfflineSnapshot>,

    /// Present only while a claim cooldown runs
    pub cooldown: Option<CooldownMarker>,
}

impl UserRecords {
    pub fn is_empty(&self) -> bool {
        self.accrual.is_none()
            && self.last_synced_at.is_none()
            && self.offline.is_none()
            && self.cooldown.is_none()
    }
}

/// Synchronous device-local store
pub trait LocalStore: Send + Sync {
    /// Read-only copy of every record held for `user`
    fn records(&self, user: &UserId) -> Result<UserRecords>;

    /// Apply `mutation` to the records of `user` and persist the result
    fn update(&self, user: &UserId, mutation: &mut dyn FnMut(&mut UserRecords)) -> Result<()>;

    /// Drop every record of `user`
    fn clear_user(&self, user: &UserId) -> Result<()>;

    // === Accrual state ===

    fn load_accrual(&self, user: &UserId) -> Result<Option<AccrualState>> {
        Ok(self.records(user)?.accrual)
    }

    fn save_accrual(&self, user: &UserId, state: &AccrualState) -> Result<()> {
        self.update(user, &mut |records| records.accrual = Some(state.clone()))
    }

    // === Sync marker ===

    fn last_synced(&self, user: &UserId) -> Result<Option<i64>> {
        Ok(self.records(user)?.last_synced_at)
    }

    fn set_last_synced(&self, user: &UserId, at: i64) -> Result<()> {
        self.update(user, &mut |records| records.last_synced_at = Some(at))
    }

    // === Offline snapshot ===

    fn save_snapshot(&self, user: &UserId, snapshot: &OfflineSnapshot) -> Result<()> {
        self.update(user, &mut |records| records.offline = Some(snapshot.clone()))
    }

    /// Remove and return the snapshot, if any
    fn take_snapshot(&self, user: &UserId) -> Result<Option<OfflineSnapshot>> {
        let mut taken = None;
        self.update(user, &mut |records| taken = records.offline.take())?;
        Ok(taken)
    }

    // === Cooldown marker ===

    fn load_cooldown(&self, user: &UserId) -> Result<Option<CooldownMarker>> {
        Ok(self.records(user)?.cooldown)
    }

    fn save_cooldown(&self, user: &UserId, marker: CooldownMarker) -> Result<()> {
        self.update(user, &mut |records| records.cooldown = Some(marker))
    }

    fn clear_cooldown(&self, user: &UserId) -> Result<()> {
        self.update(user, &mut |records| records.cooldown = None)
    }
}

/// In-process local store
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, UserRecords>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with at least one record
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }
}

impl LocalStore for MemoryStore {
    fn records(&self, user: &UserId) -> Result<UserRecords> {
        Ok(self.users.read().get(user).cloned().unwrap_or_default())
    }

    fn update(&self, user: &UserId, mutation: &mut dyn FnMut(&mut UserRecords)) -> Result<()> {
        let mut users = self.users.write();
        let records = users.entry(user.clone()).or_default();
        mutation(records);
        if records.is_empty() {
            users.remove(user);
        }
        Ok(())
    }

    fn clear_user(&self, user: &UserId) -> Result<()> {
        self.users.write().remove(user);
        Ok(())
    }
}
