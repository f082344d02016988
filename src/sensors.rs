//! Sensor reader: fetches the BMC sensor table and reduces it to one temperature.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::channel::{ManagementChannel, ManagementCommand};
use crate::error::SensorError;

pub mod parser;

pub struct SensorReader {
    channel: Arc<dyn ManagementChannel>,
    command: ManagementCommand,
    sensor_class: String,
    timeout: Duration,
}

impl SensorReader {
    pub fn new(
        channel: Arc<dyn ManagementChannel>,
        command: ManagementCommand,
        sensor_class: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            channel,
            command,
            sensor_class: sensor_class.into(),
            timeout,
        }
    }

    pub fn sensor_class(&self) -> &str {
        &self.sensor_class
    }

    /// Hottest sensor in the configured class, with the reason when there is none.
    pub async fn sample(&self) -> Result<i64, SensorError> {
        let table = self.channel.execute(&self.command, self.timeout).await?;
        trace!("Sensor table:\n{}", table);

        let max = parser::parse_max_temperature(&table, &self.sensor_class)
            .ok_or_else(|| SensorError::ParseEmpty(self.sensor_class.clone()))?;

        debug!("Max {} temperature: {}°C", self.sensor_class, max);
        Ok(max)
    }

    pub async fn read_max_temperature(&self) -> Option<i64> {
        self.sample().await.ok()
    }
}
