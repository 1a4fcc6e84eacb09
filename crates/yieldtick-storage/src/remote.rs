//! Remote record store contract
//!
//! The server keeps one record per user. Writes are insert-or-replace keyed by
//! user; concurrent writers simply overwrite each other.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use yieldtick_core::error::{AccrualError, Result};
use yieldtick_core::types::{EarningsUpsert, RemoteAccrualRecord, UserId};

/// Asynchronous, shared accrual record store
#[async_trait]
pub trait RemoteRecordStore: Send + Sync {
    /// Fetch the record of `user`, `None` when it was never created
    async fn get_user_earnings(&self, user: &UserId) -> Result<Option<RemoteAccrualRecord>>;

    /// Insert or replace the record of `user`
    ///
    /// A missing `start_date` keeps the stored one, or falls back to
    /// `last_update` when the record is created.
    async fn upsert_user_earnings(&self, user: &UserId, upsert: EarningsUpsert) -> Result<()>;
}

/// In-process record store with failure and latency injection
pub struct MemoryRemoteStore {
    records: DashMap<UserId, RemoteAccrualRecord>,
    available: AtomicBool,
    latency: Duration,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            available: AtomicBool::new(true),
            latency: Duration::ZERO,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Delay every call by `latency` (tokio time)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Simulate the store going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Seed a record directly
    pub fn insert(&self, user: UserId, record: RemoteAccrualRecord) {
        self.records.insert(user, record);
    }

    /// Peek at a record without counting a read
    pub fn record(&self, user: &UserId) -> Option<RemoteAccrualRecord> {
        self.records.get(user).map(|r| r.value().clone())
    }

    /// Successful writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Successful reads so far
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AccrualError::RemoteUnavailable("record store offline".to_string()))
        }
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteRecordStore for MemoryRemoteStore {
    async fn get_user_earnings(&self, user: &UserId) -> Result<Option<RemoteAccrualRecord>> {
        self.round_trip().await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(user))
    }

    async fn upsert_user_earnings(&self, user: &UserId, upsert: EarningsUpsert) -> Result<()> {
        self.round_trip().await?;

        if !upsert.current_earnings.is_finite() || upsert.current_earnings < 0.0 {
            return Err(AccrualError::RemoteRejected(format!(
                "current_earnings must be a non-negative number, got {}",
                upsert.current_earnings
            )));
        }

        let start_date = upsert
            .start_date
            .or_else(|| self.records.get(user).map(|r| r.start_date))
            .unwrap_or(upsert.last_update);

        self.records.insert(
            user.clone(),
            RemoteAccrualRecord {
                current_earnings: upsert.current_earnings,
                last_update: upsert.last_update,
                start_date,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);

        tracing::trace!(%user, earnings = upsert.current_earnings, "remote record upserted");
        Ok(())
    }
}
