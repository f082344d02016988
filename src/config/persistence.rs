//! Config file load, save, environment overrides and validation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::types::{AppConfig, TIER_VALUE_PLACEHOLDER};
use crate::controller::event_log::MAX_LOG_CAPACITY;
use crate::error::ConfigError;
use crate::policy::{ThresholdPolicy, TierLevel};

pub const ENV_HOST: &str = "BMC_HOST";
pub const ENV_USERNAME: &str = "BMC_USERNAME";
pub const ENV_PASSWORD: &str = "BMC_PASSWORD";

/// `config.json` next to the executable.
pub fn default_config_path() -> Result<PathBuf> {
    let exe_dir = std::env::current_exe()?
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine executable directory"))?
        .to_path_buf();
    Ok(exe_dir.join("config.json"))
}

/// Load the config file (defaults when absent) and apply BMC_* environment overrides.
/// Validation is separate; see [`validate`].
pub async fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let mut config = if config_path.exists() {
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config: {:?}", config_path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {:?}", config_path))?;
        info!("Loaded configuration from: {:?}", config_path);
        config
    } else {
        warn!("Config file {:?} not found, using defaults", config_path);
        AppConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub async fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write config: {:?}", path))?;
    info!("Configuration saved to: {:?}", path);
    Ok(())
}

/// Environment wins over the file so credentials can stay out of it.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_HOST) {
        config.bmc.host = host;
    }
    if let Some(username) = lookup(ENV_USERNAME) {
        config.bmc.username = username;
    }
    if let Some(password) = lookup(ENV_PASSWORD) {
        config.bmc.password = password;
    }
}

/// Startup checks. Any error here is fatal: the loop never starts on a bad config.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    ThresholdPolicy::new(config.control.low_bound, config.control.high_bound)?;

    for (field, value) in [
        ("control.poll_interval_secs", config.control.poll_interval_secs),
        ("bmc.command_timeout_secs", config.bmc.command_timeout_secs),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::NonPositive { field });
        }
    }
    if config.control.log_capacity == 0 {
        return Err(ConfigError::NonPositive {
            field: "control.log_capacity",
        });
    }
    if config.control.log_capacity > MAX_LOG_CAPACITY {
        return Err(ConfigError::LogCapacityTooLarge(config.control.log_capacity));
    }

    for level in TierLevel::ALL {
        let percent = config.tiers.get(level).percent;
        if percent > 100 {
            return Err(ConfigError::TierPercentOutOfRange {
                tier: level.name(),
                percent,
            });
        }
    }

    for (name, tokens) in [
        ("read_sensors", &config.commands.read_sensors),
        ("enable_manual", &config.commands.enable_manual),
        ("restore_automatic", &config.commands.restore_automatic),
        ("set_tier", &config.commands.set_tier),
    ] {
        if tokens.is_empty() {
            return Err(ConfigError::EmptyCommand(name));
        }
    }
    if !config
        .commands
        .set_tier
        .iter()
        .any(|t| t.contains(TIER_VALUE_PLACEHOLDER))
    {
        return Err(ConfigError::MissingTierPlaceholder);
    }

    config.control.startup_tier.parse::<TierLevel>()?;

    let host = config.bmc.host.trim();
    if !host.is_empty() {
        if config.bmc.username.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                host: host.to_string(),
                missing: "bmc.username",
            });
        }
        if config.bmc.password.is_empty() {
            return Err(ConfigError::MissingCredential {
                host: host.to_string(),
                missing: "bmc.password",
            });
        }
    }

    Ok(())
}

/// Copy safe to print or hand to operators.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut copy = config.clone();
    if !copy.bmc.password.is_empty() {
        copy.bmc.password = "********".to_string();
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn remote() -> AppConfig {
        let mut config = AppConfig::default();
        config.bmc.host = "10.0.0.5".to_string();
        config.bmc.username = "root".to_string();
        config.bmc.password = "calvin".to_string();
        config
    }

    #[test]
    fn defaults_are_valid_for_local_interface() {
        assert_eq!(validate(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn remote_host_requires_credentials() {
        assert_eq!(validate(&remote()), Ok(()));

        let mut config = remote();
        config.bmc.password.clear();
        assert_eq!(
            validate(&config),
            Err(ConfigError::MissingCredential {
                host: "10.0.0.5".to_string(),
                missing: "bmc.password",
            })
        );

        let mut config = remote();
        config.bmc.username = "  ".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingCredential { missing: "bmc.username", .. })
        ));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut config = AppConfig::default();
        config.control.low_bound = 80;
        config.control.high_bound = 65;
        assert_eq!(
            validate(&config),
            Err(ConfigError::InvalidThresholds { low: 80, high: 65 })
        );
    }

    #[test]
    fn rejects_bad_intervals_and_capacity() {
        let mut config = AppConfig::default();
        config.control.poll_interval_secs = 0.0;
        assert!(matches!(validate(&config), Err(ConfigError::NonPositive { .. })));

        let mut config = AppConfig::default();
        config.bmc.command_timeout_secs = f64::NAN;
        assert!(matches!(validate(&config), Err(ConfigError::NonPositive { .. })));

        let mut config = AppConfig::default();
        config.control.log_capacity = 0;
        assert!(matches!(validate(&config), Err(ConfigError::NonPositive { .. })));

        config.control.log_capacity = 21;
        assert_eq!(validate(&config), Err(ConfigError::LogCapacityTooLarge(21)));
    }

    #[test]
    fn set_tier_needs_placeholder() {
        let mut config = AppConfig::default();
        config.commands.set_tier = vec!["raw".to_string(), "0x30".to_string()];
        assert_eq!(validate(&config), Err(ConfigError::MissingTierPlaceholder));

        config.commands.set_tier.clear();
        assert_eq!(validate(&config), Err(ConfigError::EmptyCommand("set_tier")));
    }

    #[test]
    fn rejects_out_of_range_percent_and_unknown_startup_tier() {
        let mut config = AppConfig::default();
        config.tiers.high.percent = 120;
        assert_eq!(
            validate(&config),
            Err(ConfigError::TierPercentOutOfRange { tier: "high", percent: 120 })
        );

        let mut config = AppConfig::default();
        config.control.startup_tier = "max".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::UnknownTier(_))));
    }

    #[test]
    fn env_overrides_credentials() {
        let env: HashMap<&str, &str> = [("BMC_HOST", "idrac.lab"), ("BMC_PASSWORD", "s3cret")]
            .into_iter()
            .collect();
        let mut config = AppConfig::default();
        config.bmc.username = "root".to_string();

        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.bmc.host, "idrac.lab");
        assert_eq!(config.bmc.username, "root");
        assert_eq!(config.bmc.password, "s3cret");
    }

    #[test]
    fn redacted_hides_password() {
        let config = remote();
        assert_eq!(redacted(&config).bmc.password, "********");
        assert_eq!(redacted(&AppConfig::default()).bmc.password, "");
    }

    #[tokio::test]
    async fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.control.low_bound = 55;
        config.control.sensor_class = "Temp".to_string();
        config.tiers.low.value = Some("0x0a".to_string());
        save_config(&config, &path).await.unwrap();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.control.low_bound, 55);
        assert_eq!(loaded.control.sensor_class, "Temp");
        assert_eq!(loaded.tiers, config.tiers);
    }

    #[tokio::test]
    async fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"control": {"high_bound": 85}}"#).unwrap();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.control.high_bound, 85);
        assert_eq!(loaded.control.low_bound, 65);
        assert_eq!(loaded.commands.read_sensors, vec!["sdr", "type", "temperature"]);
    }

    #[tokio::test]
    async fn partial_tier_table_keeps_other_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tiers": {"low": {"percent": 20}}}"#).unwrap();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.tiers.low.percent, 20);
        assert_eq!(loaded.tiers.medium.percent, 40);
        assert_eq!(loaded.tiers.high.percent, 100);
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(load_config(Some(&path)).await.is_err());
    }
}
