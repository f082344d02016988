//! WebSocket listener for operator commands. One task per connection; every
//! connection talks to the same controller.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::commands::{error_response, handle_command};
use crate::controller::ThermalController;

pub async fn serve(listener: TcpListener, controller: Arc<ThermalController>) -> Result<()> {
    info!("Operator interface listening on ws://{}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept operator connection")?;
        debug!("Operator connected: {}", peer);

        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, controller).await {
                warn!("Operator connection {} closed with error: {}", peer, e);
            } else {
                debug!("Operator disconnected: {}", peer);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, controller: Arc<ThermalController>) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let (mut write, mut read) = ws.split();

    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                let response = match serde_json::from_str::<serde_json::Value>(text.as_str()) {
                    Ok(data) => match handle_command(&controller, &data).await {
                        Ok(response) => response,
                        Err(e) => error_response(e.to_string()),
                    },
                    Err(e) => error_response(format!("Invalid JSON: {}", e)),
                };
                write.send(Message::Text(response.to_string().into())).await?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio_tungstenite::connect_async;

    use crate::channel::testing::FakeChannel;
    use crate::config::types::AppConfig;

    async fn request(
        ws: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>,
        body: &str,
    ) -> Value {
        ws.send(Message::Text(body.to_string().into())).await.unwrap();
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn round_trips_commands_over_websocket() {
        let channel = Arc::new(FakeChannel::with_sensor_table(""));
        let controller =
            Arc::new(ThermalController::from_config(channel, &AppConfig::default(), false).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, Arc::clone(&controller)));

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let pong = request(&mut ws, r#"{"type":"ping","commandId":"a"}"#).await;
        assert_eq!(pong["data"], json!({"pong": true}));

        let toggled = request(&mut ws, r#"{"type":"toggleMode","commandId":"b"}"#).await;
        assert_eq!(toggled["data"]["mode"], "manual");

        let state = request(&mut ws, r#"{"type":"getState","commandId":"c"}"#).await;
        assert_eq!(state["data"]["mode"], "manual");

        let garbage = request(&mut ws, "not json").await;
        assert_eq!(garbage["type"], "error");

        server.abort();
    }
}
