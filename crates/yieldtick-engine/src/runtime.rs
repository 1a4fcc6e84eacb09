//! Session runtime
//!
//! Timer-driven shell around an [`AccrualSession`]. One task owns the
//! session and multiplexes:
//!
//! - the tick interval (foreground only)
//! - the reconciliation interval (pushes are spawned, never awaited in the loop)
//! - the 1 Hz cooldown countdown (foreground only)
//! - commands from the host: visibility, profile changes, claims, shutdown
//!
//! Observers read [`EarningsView`] snapshots from a `watch` channel.

use crate::error::EngineError;
use crate::session::{AccrualSession, ClaimReceipt, EarningsView};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use yieldtick_core::clock::Clock;
use yieldtick_core::error::Result as AccrualResult;
use yieldtick_core::types::{StakeProfile, Visibility};

/// Clock anchored to tokio's (pausable) time source
///
/// Lets paused-time tests move the wall clock and the timers together.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    origin_ms: i64,
    origin: Instant,
}

impl TokioClock {
    /// `origin_ms` is the wall time at the moment of creation
    pub fn new(origin_ms: i64) -> Self {
        Self {
            origin_ms,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        self.origin_ms + self.origin.elapsed().as_millis() as i64
    }
}

/// Commands accepted by the runtime task
#[derive(Debug)]
pub enum SessionCommand {
    Visibility(Visibility),
    UpdateProfile(StakeProfile),
    Claim(oneshot::Sender<AccrualResult<ClaimReceipt>>),
    Shutdown,
}

/// Spawns session runtimes
pub struct AccrualRuntime;

impl AccrualRuntime {
    /// Start driving `session` on the current tokio runtime
    pub fn spawn(session: AccrualSession) -> RuntimeHandle {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (view_tx, view_rx) = watch::channel(session.view());

        let task = tokio::spawn(run(session, command_rx, view_tx));

        RuntimeHandle {
            commands: command_tx,
            view: view_rx,
            task,
        }
    }
}

/// Host-side handle of a running session
pub struct RuntimeHandle {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<EarningsView>,
    task: JoinHandle<EarningsView>,
}

impl RuntimeHandle {
    /// Latest published projection
    pub fn current(&self) -> EarningsView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every projection change
    pub fn subscribe(&self) -> watch::Receiver<EarningsView> {
        self.view.clone()
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> Result<(), EngineError> {
        self.send(SessionCommand::Visibility(visibility)).await
    }

    pub async fn update_profile(&self, profile: StakeProfile) -> Result<(), EngineError> {
        self.send(SessionCommand::UpdateProfile(profile)).await
    }

    pub async fn claim(&self) -> Result<ClaimReceipt, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Claim(tx)).await?;
        let receipt = rx.await.map_err(|_| EngineError::RuntimeStopped)??;
        Ok(receipt)
    }

    /// Stop timers, flush the final state and return it
    pub async fn shutdown(self) -> Result<EarningsView, EngineError> {
        // the loop also stops once every sender is gone
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        drop(self.commands);
        self.task.await.map_err(|_| EngineError::RuntimeStopped)
    }

    async fn send(&self, command: SessionCommand) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::RuntimeStopped)
    }
}

fn interval_after(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn run(
    mut session: AccrualSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    view_tx: watch::Sender<EarningsView>,
) -> EarningsView {
    session.initialize().await;
    view_tx.send_replace(session.view());

    let mut tick_timer = interval_after(session.config().tick_interval());
    let mut sync_timer = interval_after(session.config().sync_interval());
    let mut countdown_timer = interval_after(Duration::from_secs(1));

    tracing::info!(user = %session.user(), "accrual runtime started");

    loop {
        tokio::select! {
            _ = tick_timer.tick(), if session.is_foreground() => {
                session.tick();
                view_tx.send_replace(session.view());
            }

            _ = sync_timer.tick() => {
                let sync = session.sync_handle();
                let user = session.user().clone();
                tokio::spawn(async move {
                    sync.sync(&user).await;
                });
            }

            _ = countdown_timer.tick(), if session.is_foreground() => {
                if session.countdown() {
                    view_tx.send_replace(session.view());
                }
            }

            command = commands.recv() => match command {
                Some(SessionCommand::Visibility(visibility)) => {
                    session.set_visibility(visibility);
                    if visibility == Visibility::Foreground {
                        tick_timer.reset();
                        countdown_timer.reset();
                    }
                    view_tx.send_replace(session.view());
                }
                Some(SessionCommand::UpdateProfile(profile)) => {
                    session.update_profile(profile);
                    if !session.is_initialized() {
                        session.initialize().await;
                    }
                    view_tx.send_replace(session.view());
                }
                Some(SessionCommand::Claim(reply)) => {
                    let result = session.begin_claim();
                    view_tx.send_replace(session.view());
                    let _ = reply.send(result);
                }
                Some(SessionCommand::Shutdown) | None => break,
            },
        }
    }

    let view = session.shutdown().await;
    view_tx.send_replace(view.clone());
    view
}
