//! Scheduler configuration

use serde::{Deserialize, Serialize};

use crate::domain::Priority;

use super::error::SchedulerError;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max tasks executing at once
    #[serde(rename = "max-concurrent", default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Priority used when a submission does not set one
    #[serde(rename = "default-priority", default)]
    pub default_priority: Priority,

    /// Retry budget used when a submission does not set one
    #[serde(rename = "default-retries", default = "default_retries")]
    pub default_retries: u32,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_retries() -> u32 {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            default_priority: Priority::default(),
            default_retries: default_retries(),
        }
    }
}

impl SchedulerConfig {
    /// Config with the given concurrency limit and default everything else
    pub fn with_limit(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.max_concurrent == 0 {
            return Err(SchedulerError::InvalidConcurrency);
        }
        if self.default_priority.is_negative() {
            return Err(SchedulerError::InvalidPriority(self.default_priority));
        }
        Ok(())
    }
}
