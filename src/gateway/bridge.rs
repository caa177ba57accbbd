use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tracing::{debug, info, warn};

use crate::{
    common::types::UserId,
    gateway::{GatewayEvent, MemberCache},
    node::{AudioClient, VoiceUpdate},
};

/// Applies gateway dispatches to the member cache and hands the bot's own
/// voice credentials to the audio node.
pub struct GatewayBridge {
    cache: Arc<MemberCache>,
    audio: Arc<dyn AudioClient>,
    /// 0 until configured or learned from `READY`.
    bot_user: AtomicU64,
}

impl GatewayBridge {
    pub fn new(cache: Arc<MemberCache>, audio: Arc<dyn AudioClient>, bot_user: Option<UserId>) -> Self {
        Self {
            cache,
            audio,
            bot_user: AtomicU64::new(bot_user.map(|u| u.0).unwrap_or(0)),
        }
    }

    pub fn cache(&self) -> &Arc<MemberCache> {
        &self.cache
    }

    fn is_bot(&self, user_id: UserId) -> bool {
        let bot = self.bot_user.load(Ordering::Relaxed);
        bot != 0 && bot == user_id.0
    }

    pub async fn handle_frame(&self, text: &str) {
        match GatewayEvent::from_frame(text) {
            Ok(Some(event)) => self.handle(event).await,
            Ok(None) => {}
            Err(e) => warn!("Dropping malformed gateway frame: {}", e),
        }
    }

    pub async fn handle(&self, event: GatewayEvent) {
        self.cache.apply(&event);

        match event {
            GatewayEvent::Ready { user_id } => {
                let configured = self.bot_user.swap(user_id.0, Ordering::Relaxed);
                if configured != 0 && configured != user_id.0 {
                    warn!(
                        "Gateway identifies as {} but bot user is configured as {}",
                        user_id, configured
                    );
                }
                info!("Gateway ready as user {}", user_id);
            }
            GatewayEvent::VoiceStateUpdate { guild_id, state } if self.is_bot(state.user_id) => {
                debug!("Bot voice state changed in guild {}", guild_id);
                let update = VoiceUpdate::State {
                    session_id: state.session_id,
                    channel_id: state.channel_id,
                };
                if let Err(e) = self.audio.update_voice(&guild_id, update).await {
                    warn!("Failed to forward voice state for guild {}: {}", guild_id, e);
                }
            }
            GatewayEvent::VoiceServerUpdate {
                guild_id,
                token,
                endpoint,
            } => {
                let update = VoiceUpdate::Server { token, endpoint };
                if let Err(e) = self.audio.update_voice(&guild_id, update).await {
                    warn!("Failed to forward voice server for guild {}: {}", guild_id, e);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::types::{ChannelId, GuildId},
        locator::GuildDirectory,
        testing::{Call, MockAudio},
    };

    fn bridge(bot: Option<UserId>) -> (GatewayBridge, Arc<MockAudio>) {
        let audio = Arc::new(MockAudio::new());
        let bridge = GatewayBridge::new(Arc::new(MemberCache::new()), audio.clone(), bot);
        (bridge, audio)
    }

    #[tokio::test]
    async fn test_only_bot_voice_state_is_forwarded() {
        let (bridge, audio) = bridge(Some(UserId(1)));
        bridge
            .handle_frame(r#"{"op":0,"t":"GUILD_CREATE","d":{"id":"5","name":"g"}}"#)
            .await;
        bridge
            .handle_frame(
                r#"{"op":0,"t":"VOICE_STATE_UPDATE","d":{"guild_id":"5","user_id":"42","channel_id":"7","session_id":"x"}}"#,
            )
            .await;
        assert!(audio.calls().is_empty());
        assert_eq!(
            bridge
                .cache()
                .member(&GuildId::from("5"), UserId(42))
                .and_then(|m| m.voice_channel),
            Some(ChannelId(7))
        );

        bridge
            .handle_frame(
                r#"{"op":0,"t":"VOICE_STATE_UPDATE","d":{"guild_id":"5","user_id":"1","channel_id":"7","session_id":"bot-session"}}"#,
            )
            .await;
        assert_eq!(
            audio.calls(),
            vec![Call::UpdateVoice(
                GuildId::from("5"),
                VoiceUpdate::State {
                    session_id: "bot-session".into(),
                    channel_id: Some(ChannelId(7)),
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_ready_learns_bot_user_and_server_update_forwards() {
        let (bridge, audio) = bridge(None);
        bridge
            .handle_frame(r#"{"op":0,"t":"READY","d":{"v":10,"user":{"id":"1"}}}"#)
            .await;
        assert!(bridge.is_bot(UserId(1)));

        bridge
            .handle_frame(
                r#"{"op":0,"t":"VOICE_SERVER_UPDATE","d":{"guild_id":"5","token":"t","endpoint":"eu.example:443"}}"#,
            )
            .await;
        assert_eq!(
            audio.calls(),
            vec![Call::UpdateVoice(
                GuildId::from("5"),
                VoiceUpdate::Server {
                    token: "t".into(),
                    endpoint: Some("eu.example:443".into()),
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let (bridge, audio) = bridge(Some(UserId(1)));
        bridge.handle_frame("not json").await;
        bridge
            .handle_frame(r#"{"op":0,"t":"VOICE_SERVER_UPDATE","d":{"guild_id":"5"}}"#)
            .await;
        assert!(audio.calls().is_empty());
    }
}
