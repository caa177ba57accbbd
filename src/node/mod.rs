//! Audio node client: the contract the dispatcher drives, and the
//! Lavalink v4 implementation of it.

use async_trait::async_trait;

use crate::{
    common::types::{AnyResult, ChannelId, GuildId},
    protocol::{LoadResult, PlayerEvent, Track},
};

pub mod backoff;
pub mod client;
pub mod socket;

pub use client::LavalinkClient;

/// Outcome of turning a free-text query into tracks.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    NoMatches,
    Track(Track),
    Playlist { name: String, tracks: Vec<Track> },
}

impl Resolution {
    /// Search hits collapse to their first result; an error load surfaces the
    /// node's message.
    pub fn from_load_result(result: LoadResult) -> AnyResult<Self> {
        Ok(match result {
            LoadResult::Track(track) => Self::Track(track),
            LoadResult::Search(mut tracks) => {
                if tracks.is_empty() {
                    Self::NoMatches
                } else {
                    Self::Track(tracks.swap_remove(0))
                }
            }
            LoadResult::Playlist(playlist) if playlist.tracks.is_empty() => Self::NoMatches,
            LoadResult::Playlist(playlist) => Self::Playlist {
                name: playlist.info.name,
                tracks: playlist.tracks,
            },
            LoadResult::Empty {} => Self::NoMatches,
            LoadResult::Error(error) => {
                return Err(error
                    .message
                    .unwrap_or_else(|| format!("Failed to load track: {}", error.cause))
                    .into());
            }
        })
    }
}

/// Voice credentials relayed from the chat gateway for the bot's own user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceUpdate {
    State {
        session_id: String,
        channel_id: Option<ChannelId>,
    },
    Server {
        token: String,
        endpoint: Option<String>,
    },
}

/// Notifications from the audio node, consumed by the event relay.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Connected {
        node: String,
        session_id: String,
        resumed: bool,
    },
    Disconnected {
        node: String,
        reason: String,
    },
    Error {
        node: String,
        message: String,
    },
    Player(PlayerEvent),
}

#[async_trait]
pub trait AudioClient: Send + Sync {
    async fn resolve(&self, query: &str) -> AnyResult<Resolution>;

    /// Requests the bot to join `channel_id`.
    async fn connect(&self, guild_id: &GuildId, channel_id: ChannelId) -> AnyResult<()>;

    /// Starts `track`, replacing whatever is loaded.
    async fn play(&self, guild_id: &GuildId, track: &Track) -> AnyResult<()>;

    async fn set_paused(&self, guild_id: &GuildId, paused: bool) -> AnyResult<()>;

    async fn stop(&self, guild_id: &GuildId) -> AnyResult<()>;

    /// Drops the player on the node and leaves voice.
    async fn destroy(&self, guild_id: &GuildId) -> AnyResult<()>;

    /// Last reported playback position in milliseconds.
    fn position(&self, guild_id: &GuildId) -> u64;

    async fn update_voice(&self, _guild_id: &GuildId, _update: VoiceUpdate) -> AnyResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::Severity,
        protocol::{LoadError, PlaylistData, PlaylistInfo},
        testing::track,
    };

    #[test]
    fn test_search_takes_first_hit() {
        let result = LoadResult::Search(vec![track("first"), track("second")]);
        assert_eq!(
            Resolution::from_load_result(result).unwrap(),
            Resolution::Track(track("first"))
        );
    }

    #[test]
    fn test_empty_loads_are_no_matches() {
        assert_eq!(
            Resolution::from_load_result(LoadResult::Empty {}).unwrap(),
            Resolution::NoMatches
        );
        assert_eq!(
            Resolution::from_load_result(LoadResult::Search(vec![])).unwrap(),
            Resolution::NoMatches
        );
        let empty_playlist = LoadResult::Playlist(PlaylistData {
            info: PlaylistInfo {
                name: "Nothing".into(),
                selected_track: -1,
            },
            plugin_info: serde_json::json!({}),
            tracks: vec![],
        });
        assert_eq!(
            Resolution::from_load_result(empty_playlist).unwrap(),
            Resolution::NoMatches
        );
    }

    #[test]
    fn test_load_error_keeps_node_message() {
        let result = LoadResult::Error(LoadError {
            message: Some("This video is unavailable".into()),
            severity: Severity::Common,
            cause: "FriendlyException".into(),
        });
        let err = Resolution::from_load_result(result).unwrap_err();
        assert_eq!(err.to_string(), "This video is unavailable");
    }
}
