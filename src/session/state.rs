use std::collections::VecDeque;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    common::types::{ChannelId, GuildId},
    protocol::Track,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Per-guild playback context.
///
/// `Playing` and `Paused` always carry a current track; `Idle` has neither a
/// current track nor anything queued.
#[derive(Debug)]
pub struct Session {
    pub guild_id: GuildId,
    /// Channel the session was created for. Not updated if the user later
    /// plays from another channel.
    pub voice_channel_id: ChannelId,
    pub state: PlaybackState,
    pub current: Option<Track>,
    /// Upcoming tracks, FIFO.
    pub queue: VecDeque<Track>,
    pub created_at: OffsetDateTime,
    /// Voice join already requested from the gateway.
    pub connected: bool,
    /// Set once the session has been torn down. A handle obtained just
    /// before teardown sees this and must not be used.
    pub closed: bool,
}

impl Session {
    pub fn new(guild_id: GuildId, voice_channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            voice_channel_id,
            state: PlaybackState::Idle,
            current: None,
            queue: VecDeque::new(),
            created_at: OffsetDateTime::now_utc(),
            connected: false,
            closed: false,
        }
    }

    /// Current track plus everything queued after it.
    pub fn queue_len(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    pub fn is_drained(&self) -> bool {
        self.state == PlaybackState::Idle && self.queue.is_empty()
    }

    pub fn begin(&mut self, track: Track) {
        self.current = Some(track);
        self.state = PlaybackState::Playing;
    }

    /// Playback ended with nothing to follow.
    pub fn finish(&mut self) {
        self.current = None;
        self.state = PlaybackState::Idle;
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.finish();
    }

    /// Whether `track` is the one currently loaded on the player.
    pub fn is_current(&self, track: &Track) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.encoded == track.encoded)
    }
}
