//! # Initialization / Merge Resolver
//!
//! Runs once per session. Reconciles the server record with the device cache
//! and produces the state the Tick Engine starts from.
//!
//! ```text
//! remote missing  ─► new epoch, start = now, earnings = max(0, local)      ─► insert
//! remote present  ─► max(local, remote) + rate × (now - remote.last_update) ─► write-through
//! remote failing  ─► continue from the local cache
//! ```

use std::sync::Arc;
use yieldtick_core::error::AccrualError;
use yieldtick_core::types::{days_between, elapsed_secs, AccrualState, EarningsUpsert, StakeProfile, UserId};
use yieldtick_economics::{merge_accrued, merge_earnings, RateCalculator};
use yieldtick_storage::{LocalStore, RemoteRecordStore};

/// Where the seeded state came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    /// No remote record existed, a new accrual epoch started
    NewEpoch,
    /// Remote record merged with the device cache
    Merged,
    /// Record store unreachable, continuing from the device cache
    LocalFallback,
}

/// Seed for the Tick Engine
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub state: AccrualState,
    pub source: ResolutionSource,

    /// Whether the remote record reflects `state`
    pub remote_written: bool,
}

/// Session-start reconciler
pub struct InitializationResolver {
    remote: Arc<dyn RemoteRecordStore>,
    local: Arc<dyn LocalStore>,
    calculator: RateCalculator,
}

impl InitializationResolver {
    pub fn new(
        remote: Arc<dyn RemoteRecordStore>,
        local: Arc<dyn LocalStore>,
        calculator: RateCalculator,
    ) -> Self {
        Self {
            remote,
            local,
            calculator,
        }
    }

    /// Resolve the starting state of `user` at `now`
    ///
    /// Never fails: every store error is logged and the best available state
    /// is returned.
    pub async fn resolve(&self, user: &UserId, profile: &StakeProfile, now: i64) -> Resolution {
        let cached = match self.local.load_accrual(user) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::error!(%user, error = %e, "failed to read local accrual cache");
                None
            }
        };
        let local_earnings = cached.as_ref().map(|s| s.current_earnings).unwrap_or(0.0);

        let resolution = match self.remote.get_user_earnings(user).await {
            Ok(Some(record)) => {
                let start_date = record.start_date_ms();
                let rate = self.calculator.rate(profile, days_between(start_date, now));
                let accumulated = merge_accrued(
                    local_earnings,
                    record.current_earnings,
                    rate,
                    elapsed_secs(record.last_update_ms(), now),
                );

                tracing::info!(
                    %user,
                    local = local_earnings,
                    remote = record.current_earnings,
                    merged = accumulated,
                    "merged remote accrual record"
                );

                let state = AccrualState {
                    last_update: now,
                    current_earnings: accumulated,
                    base_earning_rate: rate,
                    is_active: profile.has_stake(),
                    start_date,
                };
                let remote_written = self.write_through(user, &state).await;
                Resolution {
                    state,
                    source: ResolutionSource::Merged,
                    remote_written,
                }
            }
            Ok(None) => {
                let state = AccrualState::new_epoch(
                    now,
                    merge_earnings(local_earnings, 0.0),
                    self.calculator.rate(profile, 0),
                    profile.has_stake(),
                );

                tracing::info!(%user, earnings = state.current_earnings, "starting new accrual epoch");

                let remote_written = self.write_through(user, &state).await;
                Resolution {
                    state,
                    source: ResolutionSource::NewEpoch,
                    remote_written,
                }
            }
            Err(e) => {
                tracing::warn!(%user, error = %e, "record store unavailable, continuing from local cache");
                Resolution {
                    state: self.fallback(cached, profile, now),
                    source: ResolutionSource::LocalFallback,
                    remote_written: false,
                }
            }
        };

        if let Err(e) = self.local.save_accrual(user, &resolution.state) {
            tracing::error!(%user, error = %e, "failed to persist resolved accrual state");
        }
        if resolution.remote_written {
            if let Err(e) = self.local.set_last_synced(user, now) {
                tracing::error!(%user, error = %e, "failed to record sync marker");
            }
        }

        resolution
    }

    /// Cached state with rate and activity refreshed; `last_update` is kept so
    /// the first tick credits the gap since the cache was written
    fn fallback(&self, cached: Option<AccrualState>, profile: &StakeProfile, now: i64) -> AccrualState {
        match cached {
            Some(mut state) => {
                state.is_active = profile.has_stake();
                state.base_earning_rate = self.calculator.rate(profile, days_between(state.start_date, now));
                state.last_update = state.last_update.min(now);
                state
            }
            None => AccrualState::new_epoch(now, 0.0, self.calculator.rate(profile, 0), profile.has_stake()),
        }
    }

    async fn write_through(&self, user: &UserId, state: &AccrualState) -> bool {
        let result = match EarningsUpsert::at(state.current_earnings, state.last_update, Some(state.start_date)) {
            Ok(upsert) => self.remote.upsert_user_earnings(user, upsert).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                log_write_failure(user, &e);
                false
            }
        }
    }
}

fn log_write_failure(user: &UserId, error: &AccrualError) {
    tracing::warn!(%user, code = error.code(), error = %error, "write-through of merged accrual failed");
}
