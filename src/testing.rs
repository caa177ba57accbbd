//! Shared fixtures for unit tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{
    common::types::{AnyResult, ChannelId, GuildId},
    node::{AudioClient, Resolution, VoiceUpdate},
    protocol::{Track, TrackInfo},
};

/// A track whose encoded form is derived from its title.
pub fn track(title: &str) -> Track {
    Track {
        encoded: format!("enc:{}", title),
        info: TrackInfo {
            identifier: title.to_string(),
            is_seekable: true,
            author: "Test Artist".to_string(),
            length: 180_000,
            title: title.to_string(),
            uri: Some(format!("https://example.com/{}", title)),
            source_name: "test".to_string(),
            ..TrackInfo::default()
        },
        plugin_info: serde_json::Value::Null,
        user_data: serde_json::Value::Null,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    Connect(GuildId, ChannelId),
    /// Guild and track title.
    Play(GuildId, String),
    SetPaused(GuildId, bool),
    Stop(GuildId),
    Destroy(GuildId),
    UpdateVoice(GuildId, VoiceUpdate),
}

/// Records every call. Queries resolve to a single track titled after the
/// query unless overridden.
#[derive(Default)]
pub struct MockAudio {
    calls: Mutex<Vec<Call>>,
    resolutions: Mutex<HashMap<String, Resolution>>,
    resolve_error: Mutex<Option<String>>,
    fail_connect: AtomicBool,
    fail_play: AtomicBool,
    positions: DashMap<GuildId, u64>,
}

impl MockAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn set_resolution(&self, query: &str, resolution: Resolution) {
        self.resolutions.lock().insert(query.to_string(), resolution);
    }

    pub fn fail_resolve(&self, message: &str) {
        *self.resolve_error.lock() = Some(message.to_string());
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn set_position(&self, guild_id: &GuildId, position: u64) {
        self.positions.insert(guild_id.clone(), position);
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AudioClient for MockAudio {
    async fn resolve(&self, query: &str) -> AnyResult<Resolution> {
        self.record(Call::Resolve(query.to_string()));
        if let Some(message) = self.resolve_error.lock().clone() {
            return Err(message.into());
        }
        if let Some(resolution) = self.resolutions.lock().get(query) {
            return Ok(resolution.clone());
        }
        Ok(Resolution::Track(track(query)))
    }

    async fn connect(&self, guild_id: &GuildId, channel_id: ChannelId) -> AnyResult<()> {
        self.record(Call::Connect(guild_id.clone(), channel_id));
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err("Voice connection refused".into());
        }
        Ok(())
    }

    async fn play(&self, guild_id: &GuildId, track: &Track) -> AnyResult<()> {
        self.record(Call::Play(guild_id.clone(), track.info.title.clone()));
        if self.fail_play.load(Ordering::SeqCst) {
            return Err("Audio node is not connected".into());
        }
        Ok(())
    }

    async fn set_paused(&self, guild_id: &GuildId, paused: bool) -> AnyResult<()> {
        self.record(Call::SetPaused(guild_id.clone(), paused));
        Ok(())
    }

    async fn stop(&self, guild_id: &GuildId) -> AnyResult<()> {
        self.record(Call::Stop(guild_id.clone()));
        Ok(())
    }

    async fn destroy(&self, guild_id: &GuildId) -> AnyResult<()> {
        self.record(Call::Destroy(guild_id.clone()));
        Ok(())
    }

    fn position(&self, guild_id: &GuildId) -> u64 {
        self.positions.get(guild_id).map(|p| *p).unwrap_or(0)
    }

    async fn update_voice(&self, guild_id: &GuildId, update: VoiceUpdate) -> AnyResult<()> {
        self.record(Call::UpdateVoice(guild_id.clone(), update));
        Ok(())
    }
}
