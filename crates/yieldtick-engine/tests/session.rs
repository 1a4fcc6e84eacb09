//! Session-level behaviour with a manual clock and in-memory stores

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use yieldtick_core::prelude::*;
use yieldtick_core::types::{datetime_from_millis, RemoteAccrualRecord, MILLIS_PER_SECOND};
use yieldtick_engine::{
    AccrualSession, ChannelNotifier, EngineConfig, Notification, ResolutionSource, SessionDeps, SyncOutcome,
};
use yieldtick_storage::{LocalStore, MemoryRemoteStore, MemoryStore};

const NOW: i64 = 1_700_000_000_000;

struct Harness {
    clock: Arc<ManualClock>,
    local: Arc<MemoryStore>,
    remote: Arc<MemoryRemoteStore>,
    notifications: UnboundedReceiver<Notification>,
    session: AccrualSession,
}

impl Harness {
    fn new(profile: StakeProfile) -> Self {
        Self::with_stores(profile, Arc::new(MemoryStore::new()), Arc::new(MemoryRemoteStore::new()))
    }

    fn with_stores(profile: StakeProfile, local: Arc<MemoryStore>, remote: Arc<MemoryRemoteStore>) -> Self {
        let clock = Arc::new(ManualClock::new(NOW));
        let (notifier, notifications) = ChannelNotifier::new();
        let deps = SessionDeps::new(clock.clone(), local.clone(), remote.clone()).with_notifier(Arc::new(notifier));
        let session = AccrualSession::new(UserId::new("alice"), profile, EngineConfig::default(), deps);

        Self {
            clock,
            local,
            remote,
            notifications,
            session,
        }
    }

    fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_one_hour_of_ticks() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    let resolution = h.session.initialize().await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::NewEpoch);

    for _ in 0..3600 {
        h.clock.advance_secs(1);
        h.session.tick();
    }

    assert!(approx(h.session.state().current_earnings, 1.275));
    let cached = h.local.load_accrual(h.session.user()).unwrap().unwrap();
    assert_eq!(&cached, h.session.state());
}

#[tokio::test]
async fn test_earnings_never_decrease() {
    let mut h = Harness::new(StakeProfile::new(250.0, 3));
    h.session.initialize().await;

    let mut last = h.session.state().current_earnings;
    for step in [1_000, 0, -30_000, 5_000, 61_000, -1, 86_400_000] {
        h.clock.advance_ms(step);
        h.session.tick();
        let current = h.session.state().current_earnings;
        assert!(current >= last, "earnings went from {} to {}", last, current);
        last = current;
    }
}

#[tokio::test]
async fn test_initialize_merges_remote_record() {
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());
    let user = UserId::new("alice");
    let started = NOW - 120 * MILLIS_PER_SECOND;

    local
        .save_accrual(&user, &AccrualState::new_epoch(NOW - 5_000, 50.0, 0.0, true))
        .unwrap();
    remote.insert(
        user.clone(),
        RemoteAccrualRecord {
            current_earnings: 30.0,
            last_update: datetime_from_millis(started).unwrap(),
            start_date: datetime_from_millis(started).unwrap(),
        },
    );

    // 28 235.294... × 0.0306 / 86 400 = 0.01/s
    let balance = 0.01 * 86_400.0 / 0.0306;
    let mut h = Harness::with_stores(StakeProfile::new(balance, 0), local, remote);

    // seeded from the cache before reconciliation
    assert_eq!(h.session.state().current_earnings, 50.0);

    let resolution = h.session.initialize().await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::Merged);
    assert!(approx(h.session.state().current_earnings, 51.2));
    assert_eq!(h.session.state().start_date, started);

    let written = h.remote.record(&user).unwrap();
    assert!(approx(written.current_earnings, 51.2));

    // second call is a no-op
    assert!(h.session.initialize().await.is_none());
}

#[tokio::test]
async fn test_initialize_skipped_without_stake() {
    let mut h = Harness::new(StakeProfile::new(0.0, 0));

    assert!(h.session.initialize().await.is_none());
    assert!(!h.session.is_initialized());
    assert_eq!(h.remote.write_count(), 0);

    h.clock.advance_secs(600);
    h.session.tick();
    assert_eq!(h.session.state().current_earnings, 0.0);
}

#[tokio::test]
async fn test_cached_state_follows_current_stake() {
    let local = Arc::new(MemoryStore::new());
    let user = UserId::new("alice");
    let mut cached = AccrualState::new_epoch(NOW - 3_600 * MILLIS_PER_SECOND, 5.0, 0.01, true);
    cached.start_date = NOW - 7_200 * MILLIS_PER_SECOND;
    local.save_accrual(&user, &cached).unwrap();

    let mut h = Harness::with_stores(StakeProfile::new(0.0, 0), local, Arc::new(MemoryRemoteStore::new()));

    assert!(h.session.initialize().await.is_none());
    let view = h.session.view();
    assert!(!view.is_active);
    assert_eq!(view.earning_rate, 0.0);

    h.clock.advance_secs(10);
    h.session.tick();
    assert_eq!(h.session.state().current_earnings, 5.0);
    assert!(!h.session.state().is_active);
}

#[tokio::test]
async fn test_sync_is_throttled() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;
    // the new epoch insert counts as a sync
    assert_eq!(h.remote.write_count(), 1);

    h.clock.advance_secs(10);
    h.session.tick();
    assert_eq!(h.session.sync().await, SyncOutcome::Throttled);

    h.clock.advance_secs(20);
    h.session.tick();
    assert_eq!(h.session.sync().await, SyncOutcome::Throttled);
    assert_eq!(h.remote.write_count(), 1);

    h.clock.advance_secs(30);
    h.session.tick();
    assert!(h.session.sync().await.is_pushed());
    assert_eq!(h.remote.write_count(), 2);

    let record = h.remote.record(h.session.user()).unwrap();
    assert!(approx(record.current_earnings, h.session.state().current_earnings));
    assert_eq!(record.start_date_ms(), NOW);
}

#[tokio::test]
async fn test_failed_sync_is_retried() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;
    let user = h.session.user().clone();

    h.remote.set_available(false);
    h.clock.advance_secs(60);
    h.session.tick();

    assert!(matches!(h.session.sync().await, SyncOutcome::Failed(_)));
    assert_eq!(h.local.last_synced(&user).unwrap(), Some(NOW));

    h.remote.set_available(true);
    h.clock.advance_secs(1);
    h.session.tick();

    assert!(h.session.sync().await.is_pushed());
    assert_eq!(h.local.last_synced(&user).unwrap(), Some(NOW + 61_000));
    assert!(approx(
        h.remote.record(&user).unwrap().current_earnings,
        h.session.state().current_earnings
    ));
}

#[tokio::test]
async fn test_offline_credit_applied_once() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;
    let rate = h.session.state().base_earning_rate;

    h.clock.advance_secs(10);
    assert_eq!(h.session.set_visibility(Visibility::Background), None);
    let before = h.session.state().current_earnings;
    assert!(approx(before, rate * 10.0));

    h.clock.advance_secs(600);
    let credit = h.session.set_visibility(Visibility::Foreground).unwrap();
    assert!(approx(credit, rate * 600.0));
    assert!(approx(h.session.state().current_earnings, before + credit));

    // same instant: neither a second foreground nor a tick adds anything
    assert_eq!(h.session.set_visibility(Visibility::Foreground), None);
    h.session.tick();
    assert!(approx(h.session.state().current_earnings, rate * 610.0));

    let notifications = h.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].description(),
        format!("You earned {:.8} RZC while offline", credit)
    );
}

#[tokio::test]
async fn test_no_offline_credit_when_inactive() {
    let mut h = Harness::new(StakeProfile::new(0.0, 0));

    h.session.set_visibility(Visibility::Background);
    h.clock.advance_secs(3600);

    assert_eq!(h.session.set_visibility(Visibility::Foreground), None);
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn test_claim_cooldown_rejects_second_claim() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;

    let receipt = h.session.begin_claim().unwrap();
    assert_eq!(receipt.unlock_at, NOW / 1000 + 1800);

    h.clock.advance_secs(1);
    assert!(h.session.countdown());
    assert_eq!(h.session.view().claim_cooldown_remaining, 1799);

    let err = h.session.begin_claim().unwrap_err();
    assert_eq!(err, AccrualError::ClaimCooling { remaining_secs: 1799 });
}

#[tokio::test]
async fn test_stalled_countdown_does_not_extend_cooldown() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;
    h.session.begin_claim().unwrap();

    h.clock.advance_secs(3600);
    assert!(h.session.countdown());

    assert_eq!(h.session.view().claim_cooldown_remaining, 0);
    assert_eq!(h.drain(), vec![Notification::ClaimAvailable]);
    assert!(h.session.begin_claim().is_ok());
}

#[tokio::test]
async fn test_cooldown_counts_background_time() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;
    h.session.begin_claim().unwrap();

    h.session.set_visibility(Visibility::Background);
    h.clock.advance_secs(600);
    h.session.set_visibility(Visibility::Foreground);
    assert_eq!(h.session.view().claim_cooldown_remaining, 1200);
    assert!(!h.drain().contains(&Notification::ClaimAvailable));

    h.session.set_visibility(Visibility::Background);
    h.clock.advance_secs(3600);
    h.session.set_visibility(Visibility::Foreground);

    assert_eq!(h.session.view().claim_cooldown_remaining, 0);
    assert!(h.drain().contains(&Notification::ClaimAvailable));
    assert!(h.session.begin_claim().is_ok());
}

#[tokio::test]
async fn test_cooldown_restored_by_new_session() {
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());

    let mut first = Harness::with_stores(StakeProfile::new(1000.0, 0), local.clone(), remote.clone());
    first.session.initialize().await;
    first.session.begin_claim().unwrap();

    let second = Harness::with_stores(StakeProfile::new(1000.0, 0), local, remote);
    assert_eq!(second.session.view().claim_cooldown_remaining, 1800);
}

#[tokio::test]
async fn test_countdown_expiry_notifies() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;
    h.session.begin_claim().unwrap();

    for _ in 0..1800 {
        h.clock.advance_secs(1);
        h.session.countdown();
    }

    assert_eq!(h.session.view().claim_cooldown_remaining, 0);
    assert_eq!(h.drain(), vec![Notification::ClaimAvailable]);
    assert!(!h.session.countdown());
}

#[tokio::test]
async fn test_profile_update_is_prospective() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;

    h.clock.advance_secs(3600);
    h.session.update_profile(StakeProfile::new(2000.0, 0));
    assert!(approx(h.session.state().current_earnings, 1.275));

    h.clock.advance_secs(3600);
    h.session.tick();
    assert!(approx(h.session.state().current_earnings, 1.275 + 2.55));
}

#[tokio::test]
async fn test_unstaking_stops_accrual() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;

    h.clock.advance_secs(3600);
    h.session.update_profile(StakeProfile::new(0.0, 0));
    assert!(!h.session.state().is_active);

    h.clock.advance_secs(3600);
    h.session.tick();
    assert!(approx(h.session.state().current_earnings, 1.275));
}

#[tokio::test]
async fn test_shutdown_flushes_inside_throttle_window() {
    let mut h = Harness::new(StakeProfile::new(1000.0, 0));
    h.session.initialize().await;

    h.clock.advance_secs(5);
    let view = h.session.shutdown().await;

    assert_eq!(h.remote.write_count(), 2);
    let record = h.remote.record(&view.user).unwrap();
    assert!(approx(record.current_earnings, view.current_earnings));
    assert!(view.current_earnings > 0.0);
}

#[tokio::test]
async fn test_view_projection() {
    let deposit = NOW - 50 * 86_400_000;
    let mut h = Harness::new(StakeProfile::new(1000.0, 0).with_deposit_date(deposit));
    h.session.initialize().await;

    let view = h.session.view();
    assert_eq!(view.days_staked, 0);
    assert_eq!(view.time_multiplier, 1.0);
    assert!((view.staking_progress - 50.0).abs() < 1e-9);
    assert!(!view.stake_unlocked);
    assert_eq!(view.observed_at, NOW);
}
