//! Fan actuator: switches the BMC between firmware and manual fan control and
//! applies tiers. Keeps no state; the controller records what was applied.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::channel::{ManagementChannel, ManagementCommand, ManagementResult, EMPTY_OUTPUT_SENTINEL};
use crate::config::types::{CommandSettings, TIER_VALUE_PLACEHOLDER};
use crate::policy::Tier;

pub struct FanActuator {
    channel: Arc<dyn ManagementChannel>,
    enable_manual: ManagementCommand,
    restore_automatic: ManagementCommand,
    set_tier_template: Vec<String>,
    timeout: Duration,
    dry_run: bool,
}

impl FanActuator {
    pub fn new(channel: Arc<dyn ManagementChannel>, commands: &CommandSettings, timeout: Duration) -> Self {
        Self {
            channel,
            enable_manual: ManagementCommand::new(commands.enable_manual.clone()),
            restore_automatic: ManagementCommand::new(commands.restore_automatic.clone()),
            set_tier_template: commands.set_tier.clone(),
            timeout,
            dry_run: false,
        }
    }

    /// Log actuator commands instead of sending them.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Take fan control away from the BMC firmware. Safe to repeat.
    pub async fn enable_manual_mode(&self) -> ManagementResult {
        self.send(&self.enable_manual).await
    }

    pub async fn set_tier(&self, tier: &Tier) -> ManagementResult {
        let command = set_tier_command(&self.set_tier_template, &tier.value);
        debug!("Setting fans to {} ({}%) -> {}", tier.level, tier.percent, command);
        self.send(&command).await
    }

    /// Hand fan control back to the BMC firmware.
    pub async fn restore_automatic_mode(&self) -> ManagementResult {
        self.send(&self.restore_automatic).await
    }

    async fn send(&self, command: &ManagementCommand) -> ManagementResult {
        if self.dry_run {
            info!("[DRY RUN] Would execute: ipmitool {}", command);
            return Ok(EMPTY_OUTPUT_SENTINEL.to_string());
        }
        self.channel.execute(command, self.timeout).await
    }
}

/// Substitute {{TIER_VALUE}} in every token of the template.
pub fn set_tier_command(template: &[String], value: &str) -> ManagementCommand {
    ManagementCommand::new(
        template
            .iter()
            .map(|token| token.replace(TIER_VALUE_PLACEHOLDER, value)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::FakeChannel;
    use crate::error::ChannelError;
    use crate::policy::TierLevel;

    fn tier(level: TierLevel, percent: u8, value: &str) -> Tier {
        Tier {
            level,
            percent,
            value: value.to_string(),
        }
    }

    fn actuator(channel: Arc<FakeChannel>) -> FanActuator {
        FanActuator::new(channel, &CommandSettings::default(), Duration::from_secs(1))
    }

    #[test]
    fn template_substitutes_tier_value() {
        let template: Vec<String> = ["raw", "0x30", "0x30", "0x02", "0xff", "{{TIER_VALUE}}"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            set_tier_command(&template, "0x28").to_string(),
            "raw 0x30 0x30 0x02 0xff 0x28"
        );
    }

    #[tokio::test]
    async fn set_tier_sends_encoded_value() {
        let channel = Arc::new(FakeChannel::with_sensor_table(""));
        let fans = actuator(channel.clone());

        let result = fans.set_tier(&tier(TierLevel::High, 100, "0x64")).await;

        assert_eq!(result, Ok("OK".to_string()));
        assert_eq!(
            channel.calls(),
            vec![ManagementCommand::new(["raw", "0x30", "0x30", "0x02", "0xff", "0x64"])]
        );
    }

    #[tokio::test]
    async fn enable_manual_mode_is_repeatable() {
        let channel = Arc::new(FakeChannel::with_sensor_table(""));
        let fans = actuator(channel.clone());

        assert!(fans.enable_manual_mode().await.is_ok());
        assert!(fans.enable_manual_mode().await.is_ok());
        assert_eq!(channel.calls_starting_with(&["raw", "0x30", "0x30", "0x01", "0x00"]), 2);
    }

    #[tokio::test]
    async fn failure_is_passed_through() {
        let channel = Arc::new(FakeChannel::new(|_| {
            Err(ChannelError::Transport("connection refused".to_string()))
        }));
        let fans = actuator(channel);

        assert_eq!(
            fans.set_tier(&tier(TierLevel::Low, 15, "0x0f")).await,
            Err(ChannelError::Transport("connection refused".to_string()))
        );
    }

    #[tokio::test]
    async fn dry_run_never_touches_channel() {
        let channel = Arc::new(FakeChannel::new(|_| {
            Err(ChannelError::Transport("should not be called".to_string()))
        }));
        let fans = actuator(channel.clone()).dry_run(true);

        assert!(fans.enable_manual_mode().await.is_ok());
        assert!(fans.set_tier(&tier(TierLevel::Medium, 40, "0x28")).await.is_ok());
        assert!(fans.restore_automatic_mode().await.is_ok());
        assert!(channel.calls().is_empty());
    }
}
