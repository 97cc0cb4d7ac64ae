//! TaskQueue configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::retry::RetryConfig;
use crate::scheduler::SchedulerConfig;

/// Environment variable that overrides `scheduler.max-concurrent`
pub const CONCURRENT_LIMIT_ENV: &str = "TASKQUEUE_CONCURRENT_LIMIT";

/// Main TaskQueue configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Concurrency limit and per-task defaults
    pub scheduler: SchedulerConfig,

    /// Bounded retry applied inside each scheduled task
    pub retry: RetryConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate().context("Invalid scheduler configuration")?;
        if self.retry.max_attempts == 0 {
            return Err(eyre::eyre!("retry.max-attempts must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_override(std::env::var(CONCURRENT_LIMIT_ENV).ok().as_deref())?;
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskqueue.yml
        let local_config = PathBuf::from(".taskqueue.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskqueue/taskqueue.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskqueue").join("taskqueue.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Replace the concurrency limit with `value` when it is set
    pub fn apply_env_override(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(raw) = value {
            let limit: usize = raw
                .trim()
                .parse()
                .context(format!("{} must be a positive integer, got {:?}", CONCURRENT_LIMIT_ENV, raw))?;
            tracing::info!(limit, "Concurrency limit overridden from environment");
            self.scheduler.max_concurrent = limit;
        }
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
