//! Mutable controller state and the read-only snapshot handed to operators.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::event_log::{EventLog, LogEntry};
use crate::policy::TierLevel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Auto => Mode::Manual,
            Mode::Manual => Mode::Auto,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Auto => f.write_str("auto"),
            Mode::Manual => f.write_str("manual"),
        }
    }
}

/// Everything the loop and operator commands mutate. Lives behind one lock.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub mode: Mode,
    /// Last tier the BMC accepted (or the startup default).
    pub current_tier: TierLevel,
    pub last_temperature: Option<i64>,
    pub log: EventLog,
    /// Sensor sampling attempts, successful or not.
    pub samples: u64,
}

impl ControllerState {
    pub fn new(mode: Mode, current_tier: TierLevel, log_capacity: usize) -> Self {
        Self {
            mode,
            current_tier,
            last_temperature: None,
            log: EventLog::with_capacity(log_capacity),
            samples: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierView {
    pub name: TierLevel,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub last_temperature: Option<i64>,
    pub current_tier: TierView,
    pub mode: Mode,
    pub log: Vec<LogEntry>,
    pub samples: u64,
}
