//! # Yieldtick Core
//!
//! Data model shared by every Yieldtick crate.
//!
//! - `AccrualState` - the per-user running total a device extrapolates every second
//! - `RemoteAccrualRecord` - the server-held copy reconciled with it
//! - `OfflineSnapshot` / `CooldownMarker` - ephemeral device-local markers
//! - `StakeProfile` - externally owned stake attributes feeding the rate
//! - `Clock` - injected wall-clock capability
//!
//! ```text
//!   StakeProfile ──► rate ──► AccrualState ──(throttled upsert)──► RemoteAccrualRecord
//!                               ▲    │
//!                 OfflineSnapshot    └──► LocalStore (every tick)
//! ```

pub mod clock;
pub mod error;
pub mod types;

pub use clock::*;
pub use error::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SharedClock, SystemClock};
    pub use crate::error::{AccrualError, Result};
    pub use crate::types::*;
}
