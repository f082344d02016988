//! bmc-fan-controller entry point: CLI dispatch, signal handlers, async runtime.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bmc_fan_controller::app::cli::Args;
use bmc_fan_controller::app::logging::{init_tracing, level_filter, RELOAD_HANDLE};
use bmc_fan_controller::channel::{IpmitoolChannel, ManagementChannel};
use bmc_fan_controller::config::persistence::redacted;
use bmc_fan_controller::config::{load_config, save_config, validate, AppConfig};
use bmc_fan_controller::controller::ThermalController;
use bmc_fan_controller::operator;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = args.init_config.as_ref() {
        save_config(&AppConfig::default(), path).await?;
        println!("Default configuration written to {:?}", path);
        return Ok(());
    }

    // Priority: 1. --log-level flag, 2. LOG_LEVEL env, 3. config file, 4. default (info)
    let explicit_level = args
        .log_level
        .clone()
        .or_else(|| std::env::var("LOG_LEVEL").ok());
    let filter = match explicit_level.as_deref() {
        Some(level) => level_filter(level).unwrap_or_else(|| {
            eprintln!("Invalid log level '{}'. Using INFO. Valid levels: TRACE, DEBUG, INFO, WARN, ERROR, CRITICAL", level);
            "info"
        }),
        None => "info",
    };
    init_tracing(filter);

    let config = load_config(args.config.as_deref()).await?;

    if explicit_level.is_none() {
        apply_config_log_level(&config);
    }

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&redacted(&config))?);
        return Ok(());
    }

    info!("bmc-fan-controller v{} starting ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS);

    // Missing credentials or nonsensical thresholds stop us here, before the BMC is touched.
    validate(&config).context("Invalid configuration")?;

    if config.bmc.host.trim().is_empty() {
        info!("Using local BMC interface (/dev/ipmi0)");
    } else {
        info!("Using BMC at {}:{} ({})", config.bmc.host, config.bmc.port, config.bmc.interface);
    }
    if args.dry_run {
        warn!("Dry run: fan commands will be logged, not sent");
    }

    let channel: Arc<dyn ManagementChannel> = Arc::new(IpmitoolChannel::new(config.bmc.clone()));
    let controller = Arc::new(ThermalController::from_config(channel, &config, args.dry_run)?);

    if args.once {
        let _ = controller.prepare_bmc().await;
        let outcome = controller.evaluate().await;
        info!("Single pass finished: {:?}", outcome);
        println!("{}", serde_json::to_string_pretty(&controller.snapshot().await)?);
        return Ok(());
    }

    if config.operator.enabled {
        let listener = TcpListener::bind(&config.operator.listen_addr)
            .await
            .with_context(|| format!("Failed to bind operator interface on {}", config.operator.listen_addr))?;
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = operator::serve(listener, controller).await {
                error!("Operator interface stopped: {}", e);
            }
        });
    }

    #[cfg(unix)]
    spawn_sighup_reload(args.config.clone());

    tokio::select! {
        result = controller.run() => {
            if let Err(e) = result {
                error!("Control loop error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    if config.control.restore_on_exit {
        let _ = controller.restore_firmware_control().await;
    } else {
        warn!("restore_on_exit is disabled; fans stay at the last applied tier");
    }

    info!("Controller shutdown complete");
    Ok(())
}

fn apply_config_log_level(config: &AppConfig) {
    let Some(filter) = level_filter(&config.logging.level) else {
        warn!("Invalid log level '{}' in config, keeping INFO", config.logging.level);
        return;
    };
    if let Some(handle) = RELOAD_HANDLE.get() {
        if let Err(e) = handle.reload(EnvFilter::new(filter)) {
            error!("Failed to apply configured log level: {}", e);
        }
    }
}

/// SIGHUP re-reads the config file and applies its log level.
#[cfg(unix)]
fn spawn_sighup_reload(config_path: Option<std::path::PathBuf>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        loop {
            sighup.recv().await;
            info!("SIGHUP received, reloading log level configuration");
            match load_config(config_path.as_deref()).await {
                Ok(config) => {
                    apply_config_log_level(&config);
                    info!("Log level reloaded: {}", config.logging.level.to_uppercase());
                }
                Err(e) => error!("Failed to reload config: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
