//! # Yieldtick Storage
//!
//! Two persistence contracts used by the accrual engine:
//!
//! - [`LocalStore`] - synchronous, device-local, typed per-user records
//!   (accrual state, last-sync marker, offline snapshot, cooldown marker)
//! - [`RemoteRecordStore`] - asynchronous, shared, insert-or-replace record
//!   keyed by user
//!
//! ## Backends
//!
//! - `local::MemoryStore` - in-process map
//! - `file::FileStore` - JSON file, atomically rewritten on every mutation
//! - `remote::MemoryRemoteStore` - in-process record table with failure and
//!   latency injection

pub mod file;
pub mod local;
pub mod remote;

pub use file::FileStore;
pub use local::{LocalStore, MemoryStore, UserRecords};
pub use remote::{MemoryRemoteStore, RemoteRecordStore};
