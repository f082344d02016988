//! Controller configuration structs and defaults.

use serde::{Deserialize, Serialize};

use crate::controller::state::Mode;
use crate::policy::{TierLevel, TierSetting};

/// Placeholder in the `set_tier` command replaced by the tier's encoded value.
pub const TIER_VALUE_PLACEHOLDER: &str = "{{TIER_VALUE}}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bmc: BmcSettings,
    pub control: ControlSettings,
    pub tiers: TierTable,
    pub commands: CommandSettings,
    pub operator: OperatorSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BmcSettings {
    pub host: String,                 // empty = local /dev/ipmi0
    pub port: u16,
    pub interface: String,            // "lanplus" | "lan"
    pub username: String,
    pub password: String,
    pub command_timeout_secs: f64,
    pub ipmitool_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub poll_interval_secs: f64,
    pub sensor_class: String,         // matched case-insensitively against sensor names
    pub low_bound: i64,
    pub high_bound: i64,
    pub startup_tier: String,
    pub initial_mode: Mode,
    pub evaluate_on_resume: bool,
    pub restore_on_exit: bool,
    pub log_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub low: TierSetting,
    pub medium: TierSetting,
    pub high: TierSetting,
}

impl TierTable {
    pub fn get(&self, level: TierLevel) -> &TierSetting {
        match level {
            TierLevel::Low => &self.low,
            TierLevel::Medium => &self.medium,
            TierLevel::High => &self.high,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub read_sensors: Vec<String>,
    pub enable_manual: Vec<String>,
    pub restore_automatic: Vec<String>,
    pub set_tier: Vec<String>,        // must contain {{TIER_VALUE}}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorSettings {
    pub enabled: bool,
    pub listen_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

fn tokens(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

impl Default for BmcSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 623,
            interface: "lanplus".to_string(),
            username: String::new(),
            password: String::new(),
            command_timeout_secs: 10.0,
            ipmitool_path: "ipmitool".to_string(),
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30.0,
            sensor_class: "CPU".to_string(),
            low_bound: 65,
            high_bound: 80,
            startup_tier: "medium".to_string(),
            initial_mode: Mode::Auto,
            evaluate_on_resume: true,
            restore_on_exit: true,
            log_capacity: 20,
        }
    }
}

// Dell PowerEdge OEM duty cycles: 15% / 40% / 100%.
impl Default for TierTable {
    fn default() -> Self {
        Self {
            low: TierSetting::new(15),
            medium: TierSetting::new(40),
            high: TierSetting::new(100),
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            read_sensors: tokens("sdr type temperature"),
            enable_manual: tokens("raw 0x30 0x30 0x01 0x00"),
            restore_automatic: tokens("raw 0x30 0x30 0x01 0x01"),
            set_tier: tokens("raw 0x30 0x30 0x02 0xff {{TIER_VALUE}}"),
        }
    }
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:8765".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
        }
    }
}
