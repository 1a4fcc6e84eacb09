//! # Reconciliation Sync
//!
//! One-way push of the locally cached running total to the remote record.
//! Writes are throttled per user through a last-synced marker kept in the
//! local store; the marker only moves on success, so a failed push is retried
//! by the next trigger.

use std::sync::Arc;
use tokio::sync::Mutex;
use yieldtick_core::clock::SharedClock;
use yieldtick_core::error::AccrualError;
use yieldtick_core::types::{EarningsUpsert, UserId};
use yieldtick_storage::{LocalStore, RemoteRecordStore};

/// Whether enough time has passed since `last_synced` to write again
pub fn sync_due(last_synced: Option<i64>, now: i64, throttle_ms: i64) -> bool {
    match last_synced {
        Some(at) => now.saturating_sub(at) >= throttle_ms,
        None => true,
    }
}

/// Result of one sync attempt
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    /// Remote record now holds `earnings`
    Pushed { earnings: f64 },
    /// Inside the throttle window, nothing written
    Throttled,
    /// No cached accrual state for the user
    NothingCached,
    /// Another push for this engine is still running
    InFlight,
    /// Remote or local failure, logged and swallowed
    Failed(AccrualError),
}

impl SyncOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, Self::Pushed { .. })
    }
}

/// Throttled remote writer
pub struct ReconciliationSync {
    remote: Arc<dyn RemoteRecordStore>,
    local: Arc<dyn LocalStore>,
    clock: SharedClock,
    throttle_ms: i64,

    /// Held for the whole duration of a push
    push_lock: Mutex<()>,
}

impl ReconciliationSync {
    pub fn new(
        remote: Arc<dyn RemoteRecordStore>,
        local: Arc<dyn LocalStore>,
        clock: SharedClock,
        throttle_ms: u64,
    ) -> Self {
        Self {
            remote,
            local,
            clock,
            throttle_ms: throttle_ms as i64,
            push_lock: Mutex::new(()),
        }
    }

    /// Throttled push of the cached total
    pub async fn sync(&self, user: &UserId) -> SyncOutcome {
        self.run(user, false).await
    }

    /// Push regardless of the throttle window (session teardown)
    ///
    /// Waits for a running push to finish, then pushes the current cache.
    pub async fn flush(&self, user: &UserId) -> SyncOutcome {
        self.run(user, true).await
    }

    async fn run(&self, user: &UserId, force: bool) -> SyncOutcome {
        let _guard = if force {
            self.push_lock.lock().await
        } else {
            match self.push_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!(%user, "sync already in flight");
                    return SyncOutcome::InFlight;
                }
            }
        };

        let now = self.clock.now_ms();

        if !force {
            let last_synced = match self.local.last_synced(user) {
                Ok(at) => at,
                Err(e) => return self.failed(user, e),
            };
            if !sync_due(last_synced, now, self.throttle_ms) {
                return SyncOutcome::Throttled;
            }
        }

        let state = match self.local.load_accrual(user) {
            Ok(Some(state)) => state,
            Ok(None) => return SyncOutcome::NothingCached,
            Err(e) => return self.failed(user, e),
        };

        let upsert = match EarningsUpsert::at(state.current_earnings, now, Some(state.start_date)) {
            Ok(upsert) => upsert,
            Err(e) => return self.failed(user, e),
        };

        if let Err(e) = self.remote.upsert_user_earnings(user, upsert).await {
            return self.failed(user, e);
        }

        if let Err(e) = self.local.set_last_synced(user, now) {
            tracing::error!(%user, error = %e, "failed to record sync marker");
        }

        tracing::debug!(%user, earnings = state.current_earnings, force, "earnings synced");
        SyncOutcome::Pushed {
            earnings: state.current_earnings,
        }
    }

    fn failed(&self, user: &UserId, error: AccrualError) -> SyncOutcome {
        tracing::warn!(%user, code = error.code(), error = %error, "earnings sync failed");
        SyncOutcome::Failed(error)
    }
}
