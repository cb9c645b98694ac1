//! Engine configuration.
//!
//! Provides [`EngineConfig`] with defaults for worker pool size, paging,
//! retry policy and lock waits. Values can be overridden from a TOML file and
//! from `INFRANK_*` environment variables (e.g. `INFRANK_WORKERS=16`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use infrank_core::constants::{
    DEFAULT_LOCK_WAIT_MS, DEFAULT_PAGE_SIZE, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS,
    DEFAULT_SCHEDULE_INTERVAL_SECS, DEFAULT_WORKERS,
};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "INFRANK";

/// Configuration for an engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Concurrent units of work during a fleet-wide recalculation.
    pub workers: usize,
    /// Ids requested per page from the signal source and score store.
    pub page_size: usize,
    /// Attempts (including the first) for transient upstream failures.
    pub retry_attempts: u32,
    /// Base delay of the exponential retry backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// How long `recalculate_one` waits for a busy influencer, in milliseconds.
    pub lock_wait_ms: u64,
    /// Interval between scheduled fleet-wide recalculations, in seconds.
    pub schedule_interval_secs: u64,
    /// Log level filter string (e.g. "info", "debug", "infrank_engine=trace").
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            page_size: DEFAULT_PAGE_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            lock_wait_ms: DEFAULT_LOCK_WAIT_MS,
            schedule_interval_secs: DEFAULT_SCHEDULE_INTERVAL_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Default configuration file location, under the user config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("infrank")
            .join("engine.toml")
    }

    /// Load defaults, then the file at `path` (if given), then environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let cfg: EngineConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.workers == 0 {
            return Err(config::ConfigError::Message("workers must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(config::ConfigError::Message("page_size must be at least 1".into()));
        }
        if self.retry_attempts == 0 {
            return Err(config::ConfigError::Message(
                "retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }
}
