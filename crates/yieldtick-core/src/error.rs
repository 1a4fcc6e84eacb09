//! Error types for Yieldtick accrual operations

use thiserror::Error;

/// Result type alias for accrual operations
pub type Result<T> = std::result::Result<T, AccrualError>;

/// Errors that can occur while accruing, persisting or reconciling earnings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccrualError {
    // === Input ===
    /// Negative, NaN or infinite number at an API boundary
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // === Session ===
    /// Claim attempted while the cooldown is running
    #[error("Claim cooling down: {remaining_secs}s remaining")]
    ClaimCooling { remaining_secs: u64 },

    // === Remote record store ===
    /// Record store could not be reached
    #[error("Record store unreachable: {0}")]
    RemoteUnavailable(String),

    /// Record store rejected the request
    #[error("Record store rejected request: {0}")]
    RemoteRejected(String),

    // === Local persistence ===
    /// Device-local storage failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AccrualError {
    /// Stable error code for logs and host bridges
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidInput(_) => 1001,
            Self::ClaimCooling { .. } => 1003,
            Self::RemoteUnavailable(_) => 2001,
            Self::RemoteRejected(_) => 2002,
            Self::StorageError(_) => 3001,
            Self::SerializationError(_) => 3002,
        }
    }

    /// Transient failures that the next scheduled attempt retries naturally
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_)
                | Self::RemoteRejected(_)
                | Self::StorageError(_)
                | Self::ClaimCooling { .. }
        )
    }
}

impl From<serde_json::Error> for AccrualError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for AccrualError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}
