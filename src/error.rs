//! Error taxonomy shared by the channel, sensor, actuator and controller layers.

use std::time::Duration;

use thiserror::Error;

/// Why a management command did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("command exited with {status}: {details}")]
    NonZeroStatus { status: String, details: String },

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor table unavailable: {0}")]
    Channel(#[from] ChannelError),

    /// No line matched the sensor class or none carried a readable value.
    #[error("no '{0}' sensor reported a readable temperature")]
    ParseEmpty(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown tier '{0}' (expected one of: low, medium, high)")]
    InvalidTierName(String),

    #[error("fan actuation failed: {0}")]
    Actuation(#[from] ChannelError),

    #[error("control loop is already running")]
    LoopAlreadyRunning,
}

/// Startup configuration problems. Any of these stops the daemon before the loop starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("threshold low_bound ({low}) must be below high_bound ({high})")]
    InvalidThresholds { low: i64, high: i64 },

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("control.log_capacity {0} exceeds the maximum of {}", crate::controller::event_log::MAX_LOG_CAPACITY)]
    LogCapacityTooLarge(usize),

    #[error("tier '{tier}' percent {percent} exceeds 100")]
    TierPercentOutOfRange { tier: &'static str, percent: u8 },

    #[error("command list '{0}' is empty")]
    EmptyCommand(&'static str),

    #[error("set_tier command must contain the {{{{TIER_VALUE}}}} placeholder")]
    MissingTierPlaceholder,

    #[error("BMC host {host} is configured but {missing} is missing")]
    MissingCredential { host: String, missing: &'static str },

    #[error(transparent)]
    UnknownTier(#[from] ControlError),
}
