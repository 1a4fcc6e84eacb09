//! Error types for the accrual engine

use thiserror::Error;
use yieldtick_core::error::AccrualError;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Accrual error: {0}")]
    Accrual(#[from] AccrualError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Session runtime has stopped")]
    RuntimeStopped,
}
