use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::{Response, header::AUTHORIZATION};
use tracing::{debug, warn};

use crate::{
    common::{
        HttpClient,
        types::{AnyResult, ChannelId, GuildId, UserId},
    },
    configs::{BotConfig, NodeConfig},
    gateway::{GatewayCommand, ShardSender},
    node::{AudioClient, NodeEvent, Resolution, VoiceUpdate},
    protocol::{LoadResult, NodeErrorBody, PlayerUpdate, Track, VoiceState},
};

/// Voice credentials collected from the gateway until all parts are known.
#[derive(Debug, Default, Clone)]
pub(super) struct PendingVoice {
    pub channel_id: Option<ChannelId>,
    pub session_id: Option<String>,
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

impl PendingVoice {
    fn complete(&self) -> Option<VoiceState> {
        Some(VoiceState {
            token: self.token.clone()?,
            endpoint: self.endpoint.clone()?,
            session_id: self.session_id.clone()?,
            channel_id: self.channel_id.map(|c| c.to_string()),
        })
    }
}

/// Client for one Lavalink v4 compatible node.
pub struct LavalinkClient {
    pub(super) config: NodeConfig,
    pub(super) user_id: UserId,
    pub(super) client_name: String,
    http: reqwest::Client,
    /// Node session id from the websocket `ready` op.
    pub(super) session_id: RwLock<Option<String>>,
    pub(super) positions: DashMap<GuildId, u64>,
    voice: DashMap<GuildId, PendingVoice>,
    shard: Arc<dyn ShardSender>,
    pub(super) events: flume::Sender<NodeEvent>,
}

impl LavalinkClient {
    pub fn new(
        config: &NodeConfig,
        bot: &BotConfig,
        shard: Arc<dyn ShardSender>,
        events: flume::Sender<NodeEvent>,
    ) -> AnyResult<Self> {
        Ok(Self {
            config: config.clone(),
            user_id: UserId(bot.user_id),
            client_name: bot.client_name.clone(),
            http: HttpClient::new()?,
            session_id: RwLock::new(None),
            positions: DashMap::new(),
            voice: DashMap::new(),
            shard,
            events,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_connected(&self) -> bool {
        self.session_id.read().is_some()
    }

    /// Links and explicit `xxsearch:` queries pass through; anything else
    /// is searched with the configured prefix.
    pub fn identifier_for(&self, query: &str) -> String {
        let query = query.trim();
        if query.starts_with("http://") || query.starts_with("https://") {
            return query.to_string();
        }

        let explicit_search = query.split_once(':').is_some_and(|(prefix, _)| {
            prefix.ends_with("search") && prefix.chars().all(|c| c.is_ascii_alphanumeric())
        });
        if explicit_search {
            query.to_string()
        } else {
            format!("{}:{}", self.config.search_prefix, query)
        }
    }

    fn session_id(&self) -> AnyResult<String> {
        self.session_id
            .read()
            .clone()
            .ok_or_else(|| format!("Audio node \"{}\" is not connected", self.config.name).into())
    }

    fn player_url(&self, guild_id: &GuildId) -> AnyResult<String> {
        Ok(format!(
            "{}/v4/sessions/{}/players/{}",
            self.config.rest_base(),
            self.session_id()?,
            guild_id
        ))
    }

    /// Passes 2xx responses through; anything else becomes an error carrying
    /// the node's own message.
    async fn check(response: Response) -> AnyResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<NodeErrorBody>(&body)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| format!("Audio node responded with {}", status));
        Err(message.into())
    }

    async fn update_player(&self, guild_id: &GuildId, update: &PlayerUpdate) -> AnyResult<()> {
        let url = self.player_url(guild_id)?;
        debug!("PATCH {} {:?}", url, update);
        let response = self
            .http
            .patch(url)
            .header(AUTHORIZATION, &self.config.password)
            .query(&[("noReplace", "false")])
            .json(update)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn forward_voice(&self, guild_id: &GuildId) -> AnyResult<()> {
        let state = self.voice.get(guild_id).and_then(|pending| pending.complete());
        match state {
            Some(state) => {
                debug!("Forwarding voice credentials for guild {}", guild_id);
                self.update_player(guild_id, &PlayerUpdate::voice(state)).await
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AudioClient for LavalinkClient {
    async fn resolve(&self, query: &str) -> AnyResult<Resolution> {
        let identifier = self.identifier_for(query);
        debug!("Resolving identifier: {}", identifier);

        let response = self
            .http
            .get(format!("{}/v4/loadtracks", self.config.rest_base()))
            .header(AUTHORIZATION, &self.config.password)
            .query(&[("identifier", identifier.as_str())])
            .send()
            .await?;
        let result: LoadResult = Self::check(response).await?.json().await?;
        Resolution::from_load_result(result)
    }

    async fn connect(&self, guild_id: &GuildId, channel_id: ChannelId) -> AnyResult<()> {
        self.voice.entry(guild_id.clone()).or_default().channel_id = Some(channel_id);
        self.shard.send(GatewayCommand::join(guild_id.clone(), channel_id))
    }

    async fn play(&self, guild_id: &GuildId, track: &Track) -> AnyResult<()> {
        self.positions.insert(guild_id.clone(), 0);
        self.update_player(guild_id, &PlayerUpdate::play(&track.encoded)).await
    }

    async fn set_paused(&self, guild_id: &GuildId, paused: bool) -> AnyResult<()> {
        self.update_player(guild_id, &PlayerUpdate::paused(paused)).await
    }

    async fn stop(&self, guild_id: &GuildId) -> AnyResult<()> {
        self.update_player(guild_id, &PlayerUpdate::stop()).await
    }

    async fn destroy(&self, guild_id: &GuildId) -> AnyResult<()> {
        self.positions.remove(guild_id);
        self.voice.remove(guild_id);

        if let Err(e) = self.shard.send(GatewayCommand::leave(guild_id.clone())) {
            warn!("Failed to request voice leave for guild {}: {}", guild_id, e);
        }

        // Without a node session the player is already gone on the node side.
        if !self.is_connected() {
            return Ok(());
        }

        let response = self
            .http
            .delete(self.player_url(guild_id)?)
            .header(AUTHORIZATION, &self.config.password)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    fn position(&self, guild_id: &GuildId) -> u64 {
        self.positions.get(guild_id).map(|p| *p).unwrap_or(0)
    }

    async fn update_voice(&self, guild_id: &GuildId, update: VoiceUpdate) -> AnyResult<()> {
        match update {
            VoiceUpdate::State {
                channel_id: None, ..
            } => {
                self.voice.remove(guild_id);
                return Ok(());
            }
            VoiceUpdate::State {
                session_id,
                channel_id,
            } => {
                let mut pending = self.voice.entry(guild_id.clone()).or_default();
                pending.session_id = Some(session_id);
                pending.channel_id = channel_id;
            }
            VoiceUpdate::Server { token, endpoint } => {
                let mut pending = self.voice.entry(guild_id.clone()).or_default();
                pending.token = Some(token);
                pending.endpoint = endpoint;
            }
        }
        self.forward_voice(guild_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ChannelShard;

    fn client() -> (LavalinkClient, flume::Receiver<GatewayCommand>) {
        let (shard, commands) = ChannelShard::new();
        let (events, _) = flume::unbounded();
        let client = LavalinkClient::new(
            &NodeConfig::default(),
            &BotConfig::default(),
            Arc::new(shard),
            events,
        )
        .unwrap();
        (client, commands)
    }

    #[test]
    fn test_identifier_for_plain_query_uses_prefix() {
        let (client, _) = client();
        assert_eq!(client.identifier_for("  song A "), "ytmsearch:song A");
    }

    #[test]
    fn test_identifier_for_links_and_explicit_search() {
        let (client, _) = client();
        assert_eq!(
            client.identifier_for("https://youtu.be/dQw4w9WgXcQ"),
            "https://youtu.be/dQw4w9WgXcQ"
        );
        assert_eq!(client.identifier_for("scsearch:lofi"), "scsearch:lofi");
        assert_eq!(client.identifier_for("artist: title"), "ytmsearch:artist: title");
    }

    #[tokio::test]
    async fn test_rest_calls_fail_without_node_session() {
        let (client, _) = client();
        let err = client
            .set_paused(&GuildId::from("1"), true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Audio node \"main\" is not connected");
    }

    #[tokio::test]
    async fn test_connect_sends_voice_join() {
        let (client, commands) = client();
        client.connect(&GuildId::from("1"), ChannelId(5)).await.unwrap();

        assert_eq!(
            commands.try_recv().unwrap(),
            GatewayCommand::join(GuildId::from("1"), ChannelId(5))
        );
    }

    #[tokio::test]
    async fn test_partial_voice_credentials_are_held() {
        let (client, _) = client();
        let guild = GuildId::from("1");

        // No server update yet, so nothing is sent to the node.
        client
            .update_voice(
                &guild,
                VoiceUpdate::State {
                    session_id: "voice-session".into(),
                    channel_id: Some(ChannelId(5)),
                },
            )
            .await
            .unwrap();
        let pending = client.voice.get(&guild).map(|p| p.clone()).unwrap();
        assert_eq!(pending.session_id.as_deref(), Some("voice-session"));
        assert!(pending.complete().is_none());

        client
            .update_voice(
                &guild,
                VoiceUpdate::State {
                    session_id: "voice-session".into(),
                    channel_id: None,
                },
            )
            .await
            .unwrap();
        assert!(client.voice.get(&guild).is_none());
    }
}
