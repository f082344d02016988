//! Policy table: named fan tiers, their actuator encodings, and the temperature
//! thresholds that select between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::types::TierTable;
use crate::error::{ConfigError, ControlError};

/// Fan-speed tier, ordered by airflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierLevel {
    Low,
    Medium,
    High,
}

impl TierLevel {
    pub const ALL: [TierLevel; 3] = [TierLevel::Low, TierLevel::Medium, TierLevel::High];

    pub fn name(self) -> &'static str {
        match self {
            TierLevel::Low => "low",
            TierLevel::Medium => "medium",
            TierLevel::High => "high",
        }
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TierLevel {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TierLevel::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ControlError::InvalidTierName(s.to_string()))
    }
}

/// Configured duty cycle for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSetting {
    pub percent: u8,
    /// Opaque actuator value. Derived from `percent` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TierSetting {
    pub fn new(percent: u8) -> Self {
        Self { percent, value: None }
    }

    /// Value substituted into the set-tier command.
    /// 40% -> "0x28" unless an explicit value is configured.
    pub fn encoded_value(&self) -> String {
        match &self.value {
            Some(v) => v.clone(),
            None => format!("0x{:02x}", self.percent),
        }
    }
}

/// A tier resolved against the table, ready to hand to the actuator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub level: TierLevel,
    pub percent: u8,
    pub value: String,
}

/// `temp <= low` -> low, `low < temp <= high` -> medium, `temp > high` -> high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdPolicy {
    low_bound: i64,
    high_bound: i64,
}

impl ThresholdPolicy {
    pub fn new(low_bound: i64, high_bound: i64) -> Result<Self, ConfigError> {
        if low_bound >= high_bound {
            return Err(ConfigError::InvalidThresholds {
                low: low_bound,
                high: high_bound,
            });
        }
        Ok(Self {
            low_bound,
            high_bound,
        })
    }

    pub fn select(&self, temperature: i64) -> TierLevel {
        if temperature > self.high_bound {
            TierLevel::High
        } else if temperature > self.low_bound {
            TierLevel::Medium
        } else {
            TierLevel::Low
        }
    }

    pub fn low_bound(&self) -> i64 {
        self.low_bound
    }

    pub fn high_bound(&self) -> i64 {
        self.high_bound
    }
}

/// Immutable after startup.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    tiers: TierTable,
    thresholds: ThresholdPolicy,
}

impl PolicyTable {
    pub fn new(tiers: TierTable, thresholds: ThresholdPolicy) -> Self {
        Self { tiers, thresholds }
    }

    pub fn tier(&self, level: TierLevel) -> Tier {
        let setting = self.tiers.get(level);
        Tier {
            level,
            percent: setting.percent,
            value: setting.encoded_value(),
        }
    }

    /// Look up a tier by its configured name.
    pub fn resolve(&self, name: &str) -> Result<Tier, ControlError> {
        let level: TierLevel = name.parse()?;
        Ok(self.tier(level))
    }

    pub fn select(&self, temperature: i64) -> Tier {
        self.tier(self.thresholds.select(temperature))
    }

    pub fn thresholds(&self) -> &ThresholdPolicy {
        &self.thresholds
    }
}
