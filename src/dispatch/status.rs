use serde::Serialize;

use crate::{
    common::{iso_timestamp, types::GuildId},
    protocol::Track,
    session::{PlaybackState, Session},
};

/// Result of a successful `play`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub guild_id: GuildId,
    /// `"<title> by <author>"` or `"Playlist: <name> (<n> tracks)"`.
    pub title: String,
    pub enqueued: usize,
    /// Playback began with this command rather than being queued behind.
    pub started: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrentTrack {
    pub title: String,
    pub author: String,
    /// Milliseconds.
    pub duration: u64,
    pub uri: Option<String>,
    pub thumbnail: Option<String>,
}

impl From<&Track> for CurrentTrack {
    fn from(track: &Track) -> Self {
        Self {
            title: track.info.title.clone(),
            author: track.info.author.clone(),
            duration: track.info.length,
            uri: track.info.uri.clone(),
            thumbnail: track.info.artwork_url.clone(),
        }
    }
}

/// Point-in-time view of a user's player, returned by `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub connected: bool,
    pub playing: bool,
    pub paused: bool,
    pub state: PlaybackState,
    pub queue: usize,
    pub current: Option<CurrentTrack>,
    /// Milliseconds into the current track.
    pub position: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl StatusSnapshot {
    pub fn disconnected(guild: Option<String>) -> Self {
        Self {
            connected: false,
            playing: false,
            paused: false,
            state: PlaybackState::Idle,
            queue: 0,
            current: None,
            position: 0,
            guild,
            voice_channel: None,
            error: None,
            timestamp: iso_timestamp(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn from_session(
        session: &Session,
        position: u64,
        guild: Option<String>,
        voice_channel: String,
    ) -> Self {
        Self {
            connected: true,
            playing: session.state == PlaybackState::Playing,
            paused: session.state == PlaybackState::Paused,
            state: session.state,
            queue: session.queue_len(),
            current: session.current.as_ref().map(CurrentTrack::from),
            position: if session.current.is_some() { position } else { 0 },
            guild,
            voice_channel: Some(voice_channel),
            error: None,
            timestamp: iso_timestamp(),
        }
    }
}
