use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest,
    http::HeaderValue,
    protocol::Message,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    common::types::AnyResult,
    node::{LavalinkClient, NodeEvent, backoff::Backoff},
    protocol::NodeMessage,
};

/// How one websocket connection ended.
enum SocketOutcome {
    Shutdown,
    Closed(String),
}

impl LavalinkClient {
    /// Keeps the node websocket connected until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut backoff = Backoff::new();

        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let reason = match self.connect_once(&shutdown, &mut backoff).await {
                Ok(SocketOutcome::Shutdown) => {
                    debug!("[{}] Node socket shutting down cleanly", self.name());
                    return;
                }
                Ok(SocketOutcome::Closed(reason)) => reason,
                Err(e) => {
                    self.emit(NodeEvent::Error {
                        node: self.name().to_string(),
                        message: e.to_string(),
                    });
                    e.to_string()
                }
            };

            if self.session_id.write().take().is_some() {
                self.emit(NodeEvent::Disconnected {
                    node: self.name().to_string(),
                    reason: reason.clone(),
                });
            }

            let delay = backoff.next();
            warn!(
                "[{}] Node socket closed ({}). Reconnecting in {:?} (attempt {})",
                self.name(),
                reason,
                delay,
                backoff.attempts()
            );
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_once(
        &self,
        shutdown: &CancellationToken,
        backoff: &mut Backoff,
    ) -> AnyResult<SocketOutcome> {
        let url = self.config.websocket_url();
        debug!("[{}] Connecting to node websocket: {}", self.name(), url);

        let mut request = url.into_client_request()?;
        let headers = request.headers_mut();
        headers.insert("authorization", HeaderValue::from_str(&self.config.password)?);
        headers.insert("user-id", HeaderValue::from_str(&self.user_id.to_string())?);
        headers.insert("client-name", HeaderValue::from_str(&self.client_name)?);

        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();
        backoff.reset();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(SocketOutcome::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Ping(payload))) => {
                            write.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                                .unwrap_or_else(|| "closed by node".to_string());
                            return Ok(SocketOutcome::Closed(reason));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Ok(SocketOutcome::Closed(e.to_string())),
                        None => return Ok(SocketOutcome::Closed("stream ended".to_string())),
                    }
                }
            }
        }
    }

    pub(super) fn handle_text(&self, text: &str) {
        let message = match serde_json::from_str::<NodeMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("[{}] Unparseable node message: {} ({})", self.name(), e, text);
                return;
            }
        };

        match message {
            NodeMessage::Ready {
                resumed,
                session_id,
            } => {
                info!(
                    "[{}] Node ready, session {} (resumed={})",
                    self.name(),
                    session_id,
                    resumed
                );
                *self.session_id.write() = Some(session_id.clone());
                self.emit(NodeEvent::Connected {
                    node: self.name().to_string(),
                    session_id,
                    resumed,
                });
            }
            NodeMessage::PlayerUpdate { guild_id, state } => {
                self.positions.insert(guild_id, state.position);
            }
            NodeMessage::Stats { stats } => {
                trace!(
                    "[{}] Stats: {} players, {} playing",
                    self.name(),
                    stats.players,
                    stats.playing_players
                );
            }
            NodeMessage::Event { event } => self.emit(NodeEvent::Player(event)),
            NodeMessage::Unknown => debug!("[{}] Ignoring unknown op", self.name()),
        }
    }

    fn emit(&self, event: NodeEvent) {
        if self.events.send(event).is_err() {
            debug!("[{}] Event receiver dropped", self.name());
        }
    }
}
