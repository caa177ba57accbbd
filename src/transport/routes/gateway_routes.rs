use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::server::AppState;

/// GET /gateway
///
/// Websocket for the gateway adapter: it pushes raw dispatch frames in and
/// receives voice state commands (op 4) to send on its shard.
pub async fn gateway_socket(
    headers: HeaderMap,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, &'static str)> {
    let auth_header = headers.get("authorization").and_then(|h| h.to_str().ok());

    match (auth_header, state.config.gateway.password.as_deref()) {
        (Some(auth), Some(expected)) if auth == expected => {}
        (Some(_), _) => {
            warn!("Gateway authorization failed: Invalid password provided");
            return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
        }
        (None, _) => {
            warn!("Gateway authorization failed: Missing Authorization header");
            return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
        }
    }

    if let Some(name) = headers.get("client-name").and_then(|h| h.to_str().ok()) {
        info!("Incoming gateway connection from: {}", name);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Gateway adapter connected");
    let (mut sender, mut receiver) = socket.split();
    let commands = state.gateway_commands.clone();

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => state.bridge.handle_frame(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Gateway socket read error: {}", e);
                    break;
                }
            },
            command = commands.recv_async() => {
                let Ok(command) = command else { break };
                let payload = match command.to_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Failed to encode gateway command: {}", e);
                        continue;
                    }
                };
                debug!("Sending voice update for guild {}", command.guild_id());
                if let Err(e) = sender.send(Message::Text(payload.into())).await {
                    warn!("Gateway socket write error: {}", e);
                    break;
                }
            }
        }
    }

    info!("Gateway adapter disconnected");
}
