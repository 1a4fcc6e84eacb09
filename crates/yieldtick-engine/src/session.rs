//! # Accrual Session
//!
//! Session-scoped owner of one user's accrual. Wires the Tick Engine,
//! Reconciliation Sync, Initialization Resolver, Offline Catch-up Handler and
//! Claim Cooldown Gate together. Every method is driven by the caller (the
//! runtime shell or a test); nothing here owns a timer.

use crate::config::EngineConfig;
use crate::cooldown::{ClaimCooldownGate, CooldownStatus};
use crate::notify::{LogNotifier, Notification, Notifier};
use crate::offline::OfflineCatchup;
use crate::resolver::{InitializationResolver, Resolution};
use crate::sync::{ReconciliationSync, SyncOutcome};
use crate::tick::TickEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use yieldtick_core::clock::SharedClock;
use yieldtick_core::error::Result;
use yieldtick_core::types::{days_between, AccrualState, StakeProfile, UserId, Visibility};
use yieldtick_economics::{is_unlocked, staking_progress, TimeTier};
use yieldtick_storage::{LocalStore, RemoteRecordStore};

/// Collaborators injected into a session
#[derive(Clone)]
pub struct SessionDeps {
    pub clock: SharedClock,
    pub local: Arc<dyn LocalStore>,
    pub remote: Arc<dyn RemoteRecordStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl SessionDeps {
    pub fn new(clock: SharedClock, local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteRecordStore>) -> Self {
        Self {
            clock,
            local,
            remote,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Read-only projection for the presentation layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EarningsView {
    pub user: UserId,
    pub current_earnings: f64,
    pub earning_rate: f64,
    pub is_active: bool,
    pub days_staked: u64,
    pub time_multiplier: f64,
    pub staking_progress: f64,
    pub stake_unlocked: bool,
    pub claim_cooldown_remaining: u64,
    pub observed_at: i64,
}

/// Earnings snapshot taken when a claim is accepted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub amount: f64,
    pub claimed_at: i64,

    /// Unix seconds at which the next claim is allowed
    pub unlock_at: i64,
}

/// One user's accrual session
pub struct AccrualSession {
    user: UserId,
    profile: StakeProfile,
    config: EngineConfig,
    clock: SharedClock,
    notifier: Arc<dyn Notifier>,
    engine: TickEngine,
    sync: Arc<ReconciliationSync>,
    resolver: InitializationResolver,
    offline: OfflineCatchup,
    cooldown: ClaimCooldownGate,
    visibility: Visibility,
    initialized: bool,
}

impl AccrualSession {
    /// Build a session seeded from the device cache
    ///
    /// Call [`initialize`](Self::initialize) to reconcile with the record store.
    pub fn new(user: UserId, profile: StakeProfile, config: EngineConfig, deps: SessionDeps) -> Self {
        let now = deps.clock.now_ms();
        let calculator = config.calculator();

        let cached = deps.local.load_accrual(&user).unwrap_or_else(|e| {
            tracing::error!(%user, error = %e, "failed to read local accrual cache");
            None
        });
        // the cache may come from a session with a different stake
        let seed = match cached {
            Some(mut state) => {
                state.is_active = profile.has_stake();
                state.base_earning_rate = calculator.rate(&profile, days_between(state.start_date, now));
                state
            }
            None => AccrualState::new_epoch(now, 0.0, calculator.rate(&profile, 0), profile.has_stake()),
        };

        let engine = TickEngine::new(user.clone(), seed, calculator, deps.local.clone());
        let sync = Arc::new(ReconciliationSync::new(
            deps.remote.clone(),
            deps.local.clone(),
            deps.clock.clone(),
            config.sync_throttle_ms,
        ));
        let resolver = InitializationResolver::new(deps.remote.clone(), deps.local.clone(), calculator);
        let offline = OfflineCatchup::new(user.clone(), deps.local.clone(), config.min_offline_ms);
        let cooldown = ClaimCooldownGate::restore(
            user.clone(),
            deps.local.clone(),
            config.claim_cooldown_secs,
            deps.clock.now_secs(),
        );

        Self {
            user,
            profile,
            config,
            clock: deps.clock,
            notifier: deps.notifier,
            engine,
            sync,
            resolver,
            offline,
            cooldown,
            visibility: Visibility::Foreground,
            initialized: false,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn profile(&self) -> &StakeProfile {
        &self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &AccrualState {
        self.engine.state()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_foreground(&self) -> bool {
        self.visibility == Visibility::Foreground
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Shared handle for syncing off the tick path
    pub fn sync_handle(&self) -> Arc<ReconciliationSync> {
        self.sync.clone()
    }

    /// Reconcile with the record store and reseed the Tick Engine
    ///
    /// Runs once, and only for a positive stake. Returns `None` when skipped.
    pub async fn initialize(&mut self) -> Option<Resolution> {
        if self.initialized {
            return None;
        }
        if !self.profile.has_stake() {
            tracing::debug!(user = %self.user, "no stake, accrual initialization skipped");
            return None;
        }

        let resolution = self
            .resolver
            .resolve(&self.user, &self.profile, self.clock.now_ms())
            .await;
        self.engine.reseed(resolution.state.clone());
        self.initialized = true;

        tracing::info!(
            user = %self.user,
            source = ?resolution.source,
            earnings = resolution.state.current_earnings,
            rate = resolution.state.base_earning_rate,
            "accrual session initialized"
        );
        Some(resolution)
    }

    /// Advance the running total to now
    pub fn tick(&mut self) -> &AccrualState {
        let now = self.clock.now_ms();
        self.engine.tick(now, &self.profile)
    }

    /// Throttled push of the cached total
    pub async fn sync(&self) -> SyncOutcome {
        self.sync.sync(&self.user).await
    }

    /// Apply a visibility transition, returning any catch-up credit
    pub fn set_visibility(&mut self, visibility: Visibility) -> Option<f64> {
        if visibility == self.visibility && visibility == Visibility::Background {
            return None;
        }
        self.visibility = visibility;

        match visibility {
            Visibility::Background => {
                // settle up to now so the snapshot starts where the ticks stopped
                let now = self.clock.now_ms();
                self.engine.tick(now, &self.profile);
                if let Err(e) = self.offline.on_background(self.engine.state(), now) {
                    tracing::error!(user = %self.user, error = %e, "failed to save offline snapshot");
                }
                None
            }
            Visibility::Foreground => {
                let now = self.clock.now_ms();
                let credit = match self.offline.on_foreground(self.engine.state(), now) {
                    Ok(credit) => credit,
                    Err(e) => {
                        tracing::error!(user = %self.user, error = %e, "failed to read offline snapshot");
                        None
                    }
                };

                if let Some(amount) = credit {
                    self.engine.credit(amount, now);
                    self.notifier.show_snackbar(&Notification::OfflineEarnings {
                        amount,
                        symbol: self.config.symbol.clone(),
                    });
                }

                if self.cooldown.on_foreground(self.clock.now_secs()) == CooldownStatus::Expired {
                    self.notifier.show_snackbar(&Notification::ClaimAvailable);
                }
                credit
            }
        }
    }

    /// Adopt a changed stake profile
    ///
    /// Accrual up to now is settled at the old rate first.
    pub fn update_profile(&mut self, profile: StakeProfile) {
        let now = self.clock.now_ms();
        self.engine.tick(now, &self.profile);
        self.profile = profile;
        self.engine.apply_profile(now, &self.profile);

        tracing::info!(
            user = %self.user,
            balance = self.profile.balance,
            referrals = self.profile.referral_count,
            rate = self.engine.state().base_earning_rate,
            "stake profile updated"
        );
    }

    /// 1 Hz cooldown countdown step; returns whether the displayed value changed
    pub fn countdown(&mut self) -> bool {
        match self.cooldown.countdown(self.clock.now_secs()) {
            CooldownStatus::Idle => false,
            CooldownStatus::Cooling(_) => true,
            CooldownStatus::Expired => {
                self.notifier.show_snackbar(&Notification::ClaimAvailable);
                true
            }
        }
    }

    /// Claim, if the cooldown allows it
    pub fn begin_claim(&mut self) -> Result<ClaimReceipt> {
        let state = self.tick().clone();
        let marker = self.cooldown.begin(self.clock.now_secs())?;

        tracing::info!(user = %self.user, amount = state.current_earnings, "claim accepted");
        Ok(ClaimReceipt {
            amount: state.current_earnings,
            claimed_at: state.last_update,
            unlock_at: marker.unlock_at,
        })
    }

    /// Read-only projection at the current time
    pub fn view(&self) -> EarningsView {
        let now = self.clock.now_ms();
        let state = self.engine.state();
        let days_staked = state.days_staked(now);
        let lock_period_ms = self.config.lock_period_ms();

        EarningsView {
            user: self.user.clone(),
            current_earnings: state.current_earnings,
            earning_rate: state.base_earning_rate,
            is_active: state.is_active,
            days_staked,
            time_multiplier: TimeTier::from_days(days_staked).multiplier(),
            staking_progress: staking_progress(self.profile.last_deposit_date, now, lock_period_ms),
            stake_unlocked: is_unlocked(self.profile.last_deposit_date, now, lock_period_ms),
            claim_cooldown_remaining: self.cooldown.remaining(),
            observed_at: now,
        }
    }

    /// Settle, persist locally and push to the record store regardless of throttling
    pub async fn shutdown(&mut self) -> EarningsView {
        self.tick();
        let outcome = self.sync.flush(&self.user).await;
        tracing::info!(
            user = %self.user,
            earnings = self.engine.state().current_earnings,
            pushed = outcome.is_pushed(),
            "accrual session closed"
        );
        self.view()
    }
}
