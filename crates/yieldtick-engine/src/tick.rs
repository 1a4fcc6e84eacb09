//! # Tick Engine
//!
//! Advances the running total on a fixed cadence and mirrors it to the local
//! store after every tick.
//!
//! Each tick credits `previous_rate × seconds since last_update`, then
//! recomputes the rate and activity from the current profile and stake-day
//! count. Rate changes are therefore prospective. Because the credit is based
//! on elapsed wall time, a tick that was delayed (frozen tab, suspended task)
//! catches up the whole gap on its own.

use std::sync::Arc;
use yieldtick_core::types::{days_between, elapsed_secs, AccrualState, StakeProfile, UserId};
use yieldtick_economics::{accrue, RateCalculator};
use yieldtick_storage::LocalStore;

/// Pure tick step
///
/// A `now` at or before `last_update` (clock regression) leaves the state
/// untouched.
pub fn advance(
    state: &AccrualState,
    now: i64,
    profile: &StakeProfile,
    calculator: &RateCalculator,
) -> AccrualState {
    if now <= state.last_update {
        return state.clone();
    }

    let mut next = state.clone();
    if state.is_active {
        next.current_earnings = accrue(
            state.current_earnings,
            state.base_earning_rate,
            elapsed_secs(state.last_update, now),
        );
    }
    next.is_active = profile.has_stake();
    next.base_earning_rate = calculator.rate(profile, days_between(state.start_date, now));
    next.last_update = now;
    next
}

/// In-memory accrual state mirrored to the local store
pub struct TickEngine {
    user: UserId,
    state: AccrualState,
    calculator: RateCalculator,
    store: Arc<dyn LocalStore>,
}

impl TickEngine {
    pub fn new(
        user: UserId,
        seed: AccrualState,
        calculator: RateCalculator,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            user,
            state: seed,
            calculator,
            store,
        }
    }

    pub fn state(&self) -> &AccrualState {
        &self.state
    }

    pub fn calculator(&self) -> &RateCalculator {
        &self.calculator
    }

    /// Replace the in-memory state (session start, merge) and persist it
    pub fn reseed(&mut self, state: AccrualState) {
        self.state = state;
        self.persist();
    }

    /// One tick at `now`
    pub fn tick(&mut self, now: i64, profile: &StakeProfile) -> &AccrualState {
        self.state = advance(&self.state, now, profile, &self.calculator);
        tracing::trace!(
            user = %self.user,
            earnings = self.state.current_earnings,
            rate = self.state.base_earning_rate,
            "tick"
        );
        self.persist();
        &self.state
    }

    /// Add a lump credit and restart the elapsed-time baseline at `now`
    pub fn credit(&mut self, amount: f64, now: i64) {
        self.state.current_earnings = accrue(self.state.current_earnings, amount, 1.0);
        self.state.last_update = self.state.last_update.max(now);
        self.persist();
    }

    /// Re-derive rate and activity after the stake changed
    pub fn apply_profile(&mut self, now: i64, profile: &StakeProfile) {
        self.state.is_active = profile.has_stake();
        self.state.base_earning_rate = self
            .calculator
            .rate(profile, days_between(self.state.start_date, now));
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.store.save_accrual(&self.user, &self.state) {
            tracing::error!(user = %self.user, error = %e, "failed to persist accrual state");
        }
    }
}
