//! Management channel: the transport used to query sensors and drive fans on the BMC.
//!
//! Command tokens are opaque here. The channel never retries; a failed command is
//! reported once and the caller decides what happens next.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChannelError;

pub mod ipmitool;

pub use ipmitool::IpmitoolChannel;

/// Output returned when a command succeeds without printing anything.
pub const EMPTY_OUTPUT_SENTINEL: &str = "OK";

/// Trimmed command output, or the reason the command failed.
pub type ManagementResult = Result<String, ChannelError>;

/// An ordered list of tokens handed to the management transport as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementCommand {
    tokens: Vec<String>,
}

impl ManagementCommand {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl fmt::Display for ManagementCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

#[async_trait]
pub trait ManagementChannel: Send + Sync {
    /// Run one command. Must return within `timeout`.
    async fn execute(&self, command: &ManagementCommand, timeout: Duration) -> ManagementResult;
}

/// Normalize raw stdout: trim it, and map empty output to [`EMPTY_OUTPUT_SENTINEL`].
pub fn normalize_output(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        EMPTY_OUTPUT_SENTINEL.to_string()
    } else {
        trimmed.to_string()
    }
}
