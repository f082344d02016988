//! Operator command handling: dispatches incoming commands to the controller.
//!
//! Request:  {"type": "setManualTier", "commandId": "42", "payload": {"tier": "high"}}
//! Response: {"type": "commandResponse", "commandId": "42", "success": true, "data": {...}, "timestamp": ...}

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::logging::{level_filter, RELOAD_HANDLE, VALID_LOG_LEVELS};
use crate::controller::ThermalController;
use crate::policy::TierLevel;

pub async fn handle_command(controller: &ThermalController, data: &Value) -> Result<Value> {
    // Validate command structure first
    let command_type = data
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing or invalid command type"))?;

    let command_id = data
        .get("commandId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing command ID"))?;

    let payload = data.get("payload").unwrap_or(&Value::Null);

    debug!("Processing command: {} with payload: {:?}", command_type, payload);

    let (success, error_msg, result_data) = match command_type {
        "getState" => {
            let snapshot = controller.snapshot().await;
            match serde_json::to_value(&snapshot) {
                Ok(value) => (true, None, value),
                Err(e) => (false, Some(format!("Failed to serialize state: {}", e)), json!({})),
            }
        }
        "getPolicy" => {
            let policy = controller.policy();
            let tiers: Vec<_> = TierLevel::ALL.into_iter().map(|level| policy.tier(level)).collect();
            (
                true,
                None,
                json!({
                    "lowBound": policy.thresholds().low_bound(),
                    "highBound": policy.thresholds().high_bound(),
                    "tiers": tiers,
                }),
            )
        }
        "setManualTier" => {
            if let Some(tier) = payload.get("tier").and_then(|v| v.as_str()) {
                match controller.set_manual_tier(tier).await {
                    Ok(applied) => (
                        true,
                        None,
                        json!({"tier": applied.level, "percent": applied.percent}),
                    ),
                    Err(e) => (false, Some(e.to_string()), json!({})),
                }
            } else {
                (false, Some("Missing tier in setManualTier command".to_string()), json!({}))
            }
        }
        "toggleMode" => {
            let mode = controller.toggle_mode().await;
            (true, None, json!({"mode": mode}))
        }
        "setLogLevel" => {
            if let Some(level) = payload.get("level").and_then(|v| v.as_str()) {
                match set_log_level(level) {
                    Ok(_) => (true, None, json!({"level": level.to_uppercase()})),
                    Err(e) => (false, Some(e.to_string()), json!({})),
                }
            } else {
                (false, Some("Missing or invalid log level".to_string()), json!({}))
            }
        }
        "ping" => (true, None, json!({"pong": true})),
        _ => {
            warn!("Unknown command: {}", command_type);
            (false, Some(format!("Unknown command: {}", command_type)), json!({}))
        }
    };

    let mut response = json!({
        "type": "commandResponse",
        "commandId": command_id,
        "success": success,
        "data": result_data,
        "timestamp": chrono::Utc::now().timestamp_millis()
    });

    if !success {
        if let Some(err) = error_msg {
            response["error"] = Value::String(err);
        }
    }

    debug!("Command {} handled, success: {}", command_id, success);
    Ok(response)
}

/// Response for requests that could not be parsed into a command.
pub fn error_response(message: impl Into<String>) -> Value {
    json!({
        "type": "error",
        "error": message.into(),
        "timestamp": chrono::Utc::now().timestamp_millis()
    })
}

fn set_log_level(level: &str) -> Result<()> {
    let filter = level_filter(level).ok_or_else(|| {
        anyhow!("Invalid log level '{}'. Valid levels: {:?}", level, VALID_LOG_LEVELS)
    })?;

    if let Some(handle) = RELOAD_HANDLE.get() {
        match handle.reload(EnvFilter::new(filter)) {
            Ok(_) => info!("Log level changed → {}", level.to_uppercase()),
            Err(e) => {
                error!("Failed to reload log level filter: {}", e);
                return Err(anyhow!("Failed to reload log level filter: {}", e));
            }
        }
    } else {
        warn!("Log level changed → {} (filter reload unavailable)", level.to_uppercase());
    }

    Ok(())
}
