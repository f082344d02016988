//! ipmitool subprocess channel.
//! Routes commands over LAN to a remote BMC when a host is configured,
//! otherwise through the local /dev/ipmi0 interface.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::{normalize_output, ManagementChannel, ManagementCommand, ManagementResult};
use crate::config::types::BmcSettings;
use crate::error::ChannelError;

pub struct IpmitoolChannel {
    program: String,
    settings: BmcSettings,
    interface_flags: bool,
}

impl IpmitoolChannel {
    pub fn new(settings: BmcSettings) -> Self {
        Self {
            program: settings.ipmitool_path.clone(),
            settings,
            interface_flags: true,
        }
    }

    /// A channel that runs `program` with the command tokens only.
    #[cfg(test)]
    fn bare(program: &str) -> Self {
        Self {
            program: program.to_string(),
            settings: BmcSettings::default(),
            interface_flags: false,
        }
    }

    /// Build the base command with interface flags.
    /// The password travels through IPMI_PASSWORD (`-E`) so it stays out of the process list.
    fn build_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);

        if !self.interface_flags {
            return cmd;
        }

        if self.settings.host.trim().is_empty() {
            cmd.args(["-I", "open"]);
        } else {
            let port = self.settings.port.to_string();
            cmd.args([
                "-I",
                &self.settings.interface,
                "-H",
                &self.settings.host,
                "-p",
                &port,
                "-U",
                &self.settings.username,
                "-E",
            ]);
            cmd.env("IPMI_PASSWORD", &self.settings.password);
        }

        cmd
    }
}

#[async_trait]
impl ManagementChannel for IpmitoolChannel {
    async fn execute(&self, command: &ManagementCommand, timeout: Duration) -> ManagementResult {
        let mut cmd = tokio::process::Command::from(self.build_command());
        cmd.args(command.tokens())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        trace!("Executing: {} {}", self.program, command);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Err(_) => {
                warn!("{} {} timed out after {:?}", self.program, command, timeout);
                return Err(ChannelError::Timeout(timeout));
            }
            Ok(Err(e)) => {
                return Err(ChannelError::Transport(format!("failed to run {}: {}", self.program, e)));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "termination by signal".to_string(),
            };
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let details = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            debug!("{} {} failed: {} {}", self.program, command, status, details);
            return Err(ChannelError::NonZeroStatus { status, details });
        }

        Ok(normalize_output(&String::from_utf8_lossy(&output.stdout)))
    }
}
