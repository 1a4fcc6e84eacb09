//! Engine configuration

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use yieldtick_core::types::MILLIS_PER_DAY;
use yieldtick_economics::{RateCalculator, RateFormula, DEFAULT_DAILY_RATIO, LOCK_PERIOD_DAYS, SYMBOL};

/// Accrual engine configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick Engine period (ms)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Reconciliation timer period (ms)
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Minimum time between two remote writes (ms)
    #[serde(default = "default_sync_throttle_ms")]
    pub sync_throttle_ms: u64,

    /// Fraction of the stake earned per day before multipliers
    #[serde(default = "default_daily_ratio")]
    pub daily_ratio: f64,

    /// Simplified or referral-boosted rate
    #[serde(default)]
    pub rate_formula: RateFormula,

    /// Claim cooldown window (s)
    #[serde(default = "default_claim_cooldown_secs")]
    pub claim_cooldown_secs: u64,

    /// Shortest background gap that earns a catch-up credit (ms)
    #[serde(default)]
    pub min_offline_ms: u64,

    /// Staking lock period (days)
    #[serde(default = "default_lock_period_days")]
    pub lock_period_days: u64,

    /// Token symbol used in notifications
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_sync_interval_ms() -> u64 {
    60_000
}

fn default_sync_throttle_ms() -> u64 {
    60_000
}

fn default_daily_ratio() -> f64 {
    DEFAULT_DAILY_RATIO
}

fn default_claim_cooldown_secs() -> u64 {
    30 * 60
}

fn default_lock_period_days() -> u64 {
    LOCK_PERIOD_DAYS
}

fn default_symbol() -> String {
    SYMBOL.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            sync_interval_ms: default_sync_interval_ms(),
            sync_throttle_ms: default_sync_throttle_ms(),
            daily_ratio: default_daily_ratio(),
            rate_formula: RateFormula::default(),
            claim_cooldown_secs: default_claim_cooldown_secs(),
            min_offline_ms: 0,
            lock_period_days: default_lock_period_days(),
            symbol: default_symbol(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let content = toml::to_string_pretty(self).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Short windows for demos and manual testing
    pub fn development() -> Self {
        Self {
            sync_interval_ms: 5_000,
            sync_throttle_ms: 5_000,
            claim_cooldown_secs: 30,
            logging: LoggingConfig {
                level: "debug".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_interval_ms == 0 {
            return Err(EngineError::ConfigError("tick_interval_ms must be positive".to_string()));
        }
        if self.sync_interval_ms == 0 {
            return Err(EngineError::ConfigError("sync_interval_ms must be positive".to_string()));
        }
        if !self.daily_ratio.is_finite() || self.daily_ratio < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "daily_ratio must be a non-negative number, got {}",
                self.daily_ratio
            )));
        }
        Ok(())
    }

    pub fn calculator(&self) -> RateCalculator {
        RateCalculator::new(self.daily_ratio).with_formula(self.rate_formula)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn lock_period_ms(&self) -> i64 {
        self.lock_period_days as i64 * MILLIS_PER_DAY
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
