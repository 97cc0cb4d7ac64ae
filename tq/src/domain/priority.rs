//! Priority levels for task scheduling

use serde::{Deserialize, Serialize};

/// Scheduling priority. Higher values are admitted first.
///
/// Any integer is representable so callers can pass through whatever their
/// work source uses; negative values are rejected by the scheduler at
/// submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Priority(i64);

impl Priority {
    pub const LOW: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(10);
    pub const HIGH: Priority = Priority(20);
    pub const CRITICAL: Priority = Priority(30);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value as i64)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::LOW),
            "normal" => Ok(Self::NORMAL),
            "high" => Ok(Self::HIGH),
            "critical" => Ok(Self::CRITICAL),
            other => other
                .parse::<i64>()
                .map(Self)
                .map_err(|_| format!("Unknown priority: {}", s)),
        }
    }
}
