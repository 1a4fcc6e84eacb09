//! # Yieldtick Engine
//!
//! Continuous accrual with periodic reconciliation against a remote record.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ACCRUAL RUNTIME                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  1 Hz tick ─► TickEngine ─► LocalStore (every tick)              │
//! │                   ▲                                              │
//! │  session start ─► InitializationResolver ◄─► RemoteRecordStore   │
//! │  60 s timer ───► ReconciliationSync ──────► RemoteRecordStore    │
//! │  visibility ───► OfflineCatchup ─► credit ─► TickEngine          │
//! │  1 Hz ─────────► ClaimCooldownGate ─► Notifier                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Components hold no timers. [`AccrualSession`] calls them in order and
//! [`AccrualRuntime`] supplies the timers, so every rule can be exercised
//! with a manual clock.
//!
//! ## Failure model
//!
//! Record store failures are logged and swallowed. The device cache stays
//! authoritative for the lifetime of the session; the next successful push
//! carries the cumulative total forward.

pub mod config;
pub mod cooldown;
pub mod error;
pub mod notify;
pub mod offline;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod sync;
pub mod tick;

pub use config::{EngineConfig, LoggingConfig};
pub use cooldown::{ClaimCooldownGate, CooldownStatus};
pub use error::EngineError;
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier};
pub use offline::{catch_up_credit, OfflineCatchup};
pub use resolver::{InitializationResolver, Resolution, ResolutionSource};
pub use runtime::{AccrualRuntime, RuntimeHandle, SessionCommand, TokioClock};
pub use session::{AccrualSession, ClaimReceipt, EarningsView, SessionDeps};
pub use sync::{sync_due, ReconciliationSync, SyncOutcome};
pub use tick::{advance, TickEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
