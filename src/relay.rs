use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    dispatch::Dispatcher,
    node::NodeEvent,
    protocol::PlayerEvent,
};

/// Consumes node notifications on its own task, away from request handling.
pub struct EventRelay {
    dispatcher: Dispatcher,
}

impl EventRelay {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Runs until every sender is dropped. Track ends run on their own task
    /// so a guild waiting on its session lock never stalls another guild.
    pub async fn run(self, events: flume::Receiver<NodeEvent>) {
        let mut pending = JoinSet::new();

        loop {
            tokio::select! {
                event = events.recv_async() => match event {
                    Ok(NodeEvent::Player(PlayerEvent::TrackEnd { guild_id, track, reason })) => {
                        debug!("Track {} ended in guild {} ({:?})", track.label(), guild_id, reason);
                        let dispatcher = self.dispatcher.clone();
                        pending.spawn(async move {
                            dispatcher.on_track_end(&guild_id, &track, reason).await;
                        });
                    }
                    Ok(event) => self.handle(event).await,
                    Err(_) => break,
                },
                Some(joined) = pending.join_next(), if !pending.is_empty() => {
                    if let Err(e) = joined {
                        error!("Track end handler failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                error!("Track end handler failed: {}", e);
            }
        }
        debug!("Node event channel closed, relay exiting");
    }

    pub async fn handle(&self, event: NodeEvent) {
        match event {
            NodeEvent::Connected {
                node,
                session_id,
                resumed,
            } => info!("Node \"{}\" connected (session {}, resumed={})", node, session_id, resumed),
            NodeEvent::Disconnected { node, reason } => {
                warn!("Node \"{}\" disconnected: {}", node, reason)
            }
            NodeEvent::Error { node, message } => error!("Node \"{}\" error: {}", node, message),
            NodeEvent::Player(event) => self.handle_player(event).await,
        }
    }

    async fn handle_player(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackStart { guild_id, track } => {
                info!("Now playing {} in guild {}", track.label(), guild_id);
            }
            PlayerEvent::TrackEnd {
                guild_id,
                track,
                reason,
            } => {
                debug!("Track {} ended in guild {} ({:?})", track.label(), guild_id, reason);
                self.dispatcher.on_track_end(&guild_id, &track, reason).await;
            }
            PlayerEvent::TrackException {
                guild_id,
                track,
                exception,
            } => warn!(
                "Track {} failed in guild {}: {} ({:?})",
                track.label(),
                guild_id,
                exception.message.as_deref().unwrap_or(&exception.cause),
                exception.severity
            ),
            PlayerEvent::TrackStuck {
                guild_id,
                track,
                threshold_ms,
            } => warn!(
                "Track {} stuck for {}ms in guild {}",
                track.label(),
                threshold_ms,
                guild_id
            ),
            PlayerEvent::WebSocketClosed {
                guild_id,
                code,
                reason,
                by_remote,
            } => warn!(
                "Voice connection closed in guild {}: {} {} (by_remote={})",
                guild_id, code, reason, by_remote
            ),
            PlayerEvent::Unknown => debug!("Ignoring unknown player event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        common::types::{ChannelId, GuildId, UserId},
        gateway::MemberCache,
        locator::UserLocator,
        protocol::TrackEndReason,
        session::SessionRegistry,
        testing::{Call, MockAudio, track},
    };

    fn setup() -> (Dispatcher, Arc<MockAudio>) {
        let cache = Arc::new(MemberCache::new());
        cache.upsert_guild(GuildId::from("g1"), "Guild One");
        cache.upsert_member(&GuildId::from("g1"), UserId(42), Some(ChannelId(10)));
        cache.upsert_guild(GuildId::from("g2"), "Guild Two");
        cache.upsert_member(&GuildId::from("g2"), UserId(43), Some(ChannelId(20)));

        let audio = Arc::new(MockAudio::new());
        let dispatcher = Dispatcher::new(
            UserLocator::new(cache),
            Arc::new(SessionRegistry::new()),
            audio.clone(),
            Duration::from_secs(5),
        );
        (dispatcher, audio)
    }

    fn track_end(title: &str, reason: TrackEndReason) -> NodeEvent {
        track_end_in("g1", title, reason)
    }

    fn track_end_in(guild: &str, title: &str, reason: TrackEndReason) -> NodeEvent {
        NodeEvent::Player(PlayerEvent::TrackEnd {
            guild_id: GuildId::from(guild),
            track: track(title),
            reason,
        })
    }

    #[tokio::test]
    async fn test_queue_drained_tears_down_immediately() {
        let (dispatcher, audio) = setup();
        dispatcher.play(UserId(42), "a", None).await.unwrap();

        let (tx, rx) = flume::unbounded();
        tx.send(NodeEvent::Player(PlayerEvent::TrackStart {
            guild_id: GuildId::from("g1"),
            track: track("a"),
        }))
        .unwrap();
        tx.send(track_end("a", TrackEndReason::Finished)).unwrap();
        drop(tx);

        EventRelay::new(dispatcher.clone()).run(rx).await;
        assert!(dispatcher.registry().is_empty());
        assert_eq!(audio.calls().last(), Some(&Call::Destroy(GuildId::from("g1"))));
    }

    #[tokio::test]
    async fn test_node_events_do_not_touch_sessions() {
        let (dispatcher, audio) = setup();
        dispatcher.play(UserId(42), "a", None).await.unwrap();
        audio.clear_calls();

        let relay = EventRelay::new(dispatcher.clone());
        relay
            .handle(NodeEvent::Disconnected {
                node: "main".into(),
                reason: "stream ended".into(),
            })
            .await;
        relay
            .handle(NodeEvent::Error {
                node: "main".into(),
                message: "boom".into(),
            })
            .await;
        relay.handle(track_end("a", TrackEndReason::Replaced)).await;

        assert_eq!(dispatcher.registry().len(), 1);
        assert!(audio.calls().is_empty());
    }

    #[tokio::test]
    async fn test_locked_guild_does_not_stall_others() {
        let (dispatcher, _audio) = setup();
        dispatcher.play(UserId(42), "a", None).await.unwrap();
        dispatcher.play(UserId(43), "b", None).await.unwrap();

        let busy = dispatcher.registry().get(&GuildId::from("g1")).unwrap();
        let guard = busy.lock().await;

        let (tx, rx) = flume::unbounded();
        tx.send(track_end_in("g1", "a", TrackEndReason::Finished)).unwrap();
        tx.send(track_end_in("g2", "b", TrackEndReason::Finished)).unwrap();
        let relay = tokio::spawn(EventRelay::new(dispatcher.clone()).run(rx));

        tokio::time::timeout(Duration::from_secs(1), async {
            while dispatcher.registry().get(&GuildId::from("g2")).is_some() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("guild two was not torn down while guild one was locked");
        assert!(dispatcher.registry().get(&GuildId::from("g1")).is_some());

        drop(guard);
        drop(tx);
        relay.await.unwrap();
        assert!(dispatcher.registry().is_empty());
    }
}
