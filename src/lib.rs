//! Closed-loop chassis fan control for rack servers.
//!
//! A single control loop samples CPU temperatures through the BMC, picks a fan
//! tier from operator-supplied thresholds and applies it, while operators can
//! pin a tier or suspend automatic control at any time.

pub mod app;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod fans;
pub mod operator;
pub mod policy;
pub mod sensors;

pub use channel::{ManagementChannel, ManagementCommand, ManagementResult};
pub use controller::state::{ControllerSnapshot, Mode};
pub use controller::ThermalController;
pub use error::{ChannelError, ConfigError, ControlError, SensorError};
