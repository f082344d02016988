//! Thermal controller: the sample -> decide -> actuate loop and the operator
//! commands that share its state.
//!
//! Locking rules:
//!   - `state` is only held to read inputs or commit results, never across a BMC call.
//!   - `actuation` is held across "send set-tier + commit current_tier" so the
//!     recorded tier always matches the last command the BMC accepted.
//!   - There is exactly one loop per controller; re-entering auto mode wakes it
//!     through `evaluate_now` instead of starting another one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::channel::{ManagementChannel, ManagementCommand, ManagementResult};
use crate::config::types::{AppConfig, ControlSettings};
use crate::error::{ConfigError, ControlError};
use crate::fans::FanActuator;
use crate::policy::{PolicyTable, ThresholdPolicy, Tier, TierLevel};
use crate::sensors::SensorReader;

pub mod event_log;
pub mod state;

use state::{ControllerSnapshot, ControllerState, Mode, TierView};

/// What one evaluation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Manual mode; nothing sampled or sent.
    Skipped,
    SamplingFailed,
    Applied { temperature: i64, tier: TierLevel },
    ActuationFailed { temperature: i64, tier: TierLevel },
}

pub struct ThermalController {
    state: RwLock<ControllerState>,
    sensors: SensorReader,
    fans: FanActuator,
    policy: PolicyTable,
    actuation: Mutex<()>,
    evaluate_now: Notify,
    loop_started: AtomicBool,
    poll_interval: Duration,
    evaluate_on_resume: bool,
}

impl ThermalController {
    pub fn new(
        sensors: SensorReader,
        fans: FanActuator,
        policy: PolicyTable,
        settings: &ControlSettings,
    ) -> Result<Self, ConfigError> {
        let poll_interval = positive_secs(settings.poll_interval_secs, "control.poll_interval_secs")?;
        let startup_tier: TierLevel = settings.startup_tier.parse()?;

        Ok(Self {
            state: RwLock::new(ControllerState::new(
                settings.initial_mode,
                startup_tier,
                settings.log_capacity,
            )),
            sensors,
            fans,
            policy,
            actuation: Mutex::new(()),
            evaluate_now: Notify::new(),
            loop_started: AtomicBool::new(false),
            poll_interval,
            evaluate_on_resume: settings.evaluate_on_resume,
        })
    }

    /// Wire sensors, actuator and policy from a validated configuration.
    pub fn from_config(
        channel: Arc<dyn ManagementChannel>,
        config: &AppConfig,
        dry_run: bool,
    ) -> Result<Self, ConfigError> {
        let timeout = positive_secs(config.bmc.command_timeout_secs, "bmc.command_timeout_secs")?;

        let sensors = SensorReader::new(
            Arc::clone(&channel),
            ManagementCommand::new(config.commands.read_sensors.clone()),
            config.control.sensor_class.clone(),
            timeout,
        );
        let fans = FanActuator::new(channel, &config.commands, timeout).dry_run(dry_run);
        let thresholds = ThresholdPolicy::new(config.control.low_bound, config.control.high_bound)?;
        let policy = PolicyTable::new(config.tiers.clone(), thresholds);

        Self::new(sensors, fans, policy, &config.control)
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.read().await;
        let tier = self.policy.tier(state.current_tier);
        ControllerSnapshot {
            last_temperature: state.last_temperature,
            current_tier: TierView {
                name: tier.level,
                percent: tier.percent,
            },
            mode: state.mode,
            log: state.log.to_vec(),
            samples: state.samples,
        }
    }

    pub async fn mode(&self) -> Mode {
        self.state.read().await.mode
    }

    /// Apply a tier chosen by the operator. Does not change the mode.
    pub async fn set_manual_tier(&self, name: &str) -> Result<Tier, ControlError> {
        let tier = self.policy.resolve(name)?;

        let _actuation = self.actuation.lock().await;
        let result = self.fans.set_tier(&tier).await;

        let mut state = self.state.write().await;
        match result {
            Ok(_) => {
                state.current_tier = tier.level;
                let message = format!("Manual tier set to {} ({}%)", tier.level, tier.percent);
                info!("{}", message);
                state.log.push(message);
                Ok(tier)
            }
            Err(e) => {
                let message = format!(
                    "Manual tier {} ({}%) failed: {}; keeping {}",
                    tier.level, tier.percent, e, state.current_tier
                );
                warn!("{}", message);
                state.log.push(message);
                Err(ControlError::Actuation(e))
            }
        }
    }

    /// Flip between auto and manual. Re-entering auto asks the loop for one extra pass.
    pub async fn toggle_mode(&self) -> Mode {
        let mode = {
            let mut state = self.state.write().await;
            state.mode = state.mode.toggled();
            let mode = state.mode;
            state.log.push(format!("Mode switched to {}", mode));
            mode
        };

        info!("Control mode switched to {}", mode);

        if mode == Mode::Auto && self.evaluate_on_resume {
            // At most one wake-up is ever pending; the pass runs inside the loop task.
            self.evaluate_now.notify_one();
        }
        mode
    }

    /// Take fan control away from the BMC firmware. Failure is logged, not fatal.
    pub async fn prepare_bmc(&self) -> ManagementResult {
        let result = self.fans.enable_manual_mode().await;

        let mut state = self.state.write().await;
        match &result {
            Ok(_) => {
                info!("BMC switched to manual fan control");
                state.log.push("BMC switched to manual fan control");
            }
            Err(e) => {
                let message = format!("Failed to switch BMC to manual fan control: {}", e);
                error!("{}", message);
                state.log.push(message);
            }
        }
        result
    }

    /// One sample -> decide -> actuate pass.
    pub async fn evaluate(&self) -> PassOutcome {
        if self.mode().await == Mode::Manual {
            trace!("Manual mode, skipping evaluation");
            return PassOutcome::Skipped;
        }

        let temperature = match self.sensors.sample().await {
            Ok(t) => t,
            Err(e) => {
                let mut state = self.state.write().await;
                state.samples += 1;
                let message = format!("Sensor read failed: {}", e);
                warn!("{}", message);
                state.log.push(message);
                return PassOutcome::SamplingFailed;
            }
        };

        let tier = self.policy.select(temperature);
        let class = self.sensors.sensor_class();

        let _actuation = self.actuation.lock().await;

        // The operator may have taken over while the sensors were being read.
        {
            let mut state = self.state.write().await;
            if state.mode == Mode::Manual {
                state.samples += 1;
                state.last_temperature = Some(temperature);
                debug!(
                    "Switched to manual during the pass, dropping {} for {}°C",
                    tier.level, temperature
                );
                return PassOutcome::Skipped;
            }
        }

        let result = self.fans.set_tier(&tier).await;

        let mut state = self.state.write().await;
        state.samples += 1;
        state.last_temperature = Some(temperature);

        match result {
            Ok(_) => {
                state.current_tier = tier.level;
                let message = format!("{} {}°C -> {} ({}%)", class, temperature, tier.level, tier.percent);
                info!("{}", message);
                state.log.push(message);
                PassOutcome::Applied {
                    temperature,
                    tier: tier.level,
                }
            }
            Err(e) => {
                let message = format!(
                    "{} {}°C -> {} ({}%) failed: {}; keeping {}",
                    class, temperature, tier.level, tier.percent, e, state.current_tier
                );
                warn!("{}", message);
                state.log.push(message);
                PassOutcome::ActuationFailed {
                    temperature,
                    tier: tier.level,
                }
            }
        }
    }

    /// Run the control loop until the future is dropped.
    /// Switches the BMC to manual fan control once, then evaluates every poll interval.
    pub async fn run(&self) -> Result<(), ControlError> {
        if self.loop_started.swap(true, Ordering::SeqCst) {
            return Err(ControlError::LoopAlreadyRunning);
        }

        let _ = self.prepare_bmc().await;

        info!(
            "Thermal control loop started: every {:?}, thresholds {}/{}°C",
            self.poll_interval,
            self.policy.thresholds().low_bound(),
            self.policy.thresholds().high_bound()
        );

        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.evaluate_now.notified() => {
                    debug!("Automatic control resumed, evaluating now");
                }
            }
            self.evaluate().await;
        }
    }

    /// Hand fan control back to the BMC firmware (shutdown path).
    pub async fn restore_firmware_control(&self) -> ManagementResult {
        let _actuation = self.actuation.lock().await;
        let result = self.fans.restore_automatic_mode().await;

        let mut state = self.state.write().await;
        match &result {
            Ok(_) => {
                info!("Fans returned to BMC automatic control");
                state.log.push("Fans returned to BMC automatic control");
            }
            Err(e) => {
                let message = format!("Failed to restore BMC automatic fan control: {}", e);
                error!("{}", message);
                state.log.push(message);
            }
        }
        result
    }
}

fn positive_secs(value: f64, field: &'static str) -> Result<Duration, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(Duration::from_secs_f64(value))
    } else {
        Err(ConfigError::NonPositive { field })
    }
}
