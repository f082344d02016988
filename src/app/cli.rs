//! Command-line argument definitions (clap).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bmc-fan-controller")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Closed-loop chassis fan controller driven through the BMC", long_about = None)]
pub struct Args {
    // === Config ===
    /// Path to config.json (default: next to the executable)
    #[arg(short = 'c', long, value_name = "PATH", help_heading = "Config")]
    pub config: Option<PathBuf>,

    /// Write a default configuration file and exit
    #[arg(long = "init-config", value_name = "PATH", help_heading = "Config")]
    pub init_config: Option<PathBuf>,

    /// Print the effective configuration (password redacted) and exit
    #[arg(long = "show-config", help_heading = "Config")]
    pub show_config: bool,

    // === Control ===
    /// Log fan commands instead of sending them (sensor reads still hit the BMC)
    #[arg(long = "dry-run", help_heading = "Control")]
    pub dry_run: bool,

    /// Take one sample, apply one tier, print the resulting state and exit
    #[arg(long, help_heading = "Control")]
    pub once: bool,

    // === Logging ===
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL)
    #[arg(long = "log-level", value_name = "LEVEL", help_heading = "Logging")]
    pub log_level: Option<String>,
}
