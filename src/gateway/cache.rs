use std::collections::HashMap;

use dashmap::DashMap;
use tracing::trace;

use crate::{
    common::types::{ChannelId, GuildId, UserId},
    gateway::GatewayEvent,
    locator::{GuildDirectory, MemberState},
};

#[derive(Debug, Default)]
struct GuildEntry {
    name: String,
    channels: HashMap<ChannelId, String>,
    members: HashMap<UserId, MemberState>,
}

/// Guild membership and voice presence, fed by gateway dispatches.
#[derive(Debug, Default)]
pub struct MemberCache {
    guilds: DashMap<GuildId, GuildEntry>,
}

impl MemberCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_guild(&self, guild_id: GuildId, name: &str) {
        self.guilds.entry(guild_id).or_default().name = name.to_string();
    }

    pub fn remove_guild(&self, guild_id: &GuildId) {
        self.guilds.remove(guild_id);
    }

    pub fn upsert_channel(&self, guild_id: &GuildId, channel_id: ChannelId, name: &str) {
        if let Some(mut guild) = self.guilds.get_mut(guild_id) {
            guild.channels.insert(channel_id, name.to_string());
        }
    }

    /// Records a member with an explicit voice channel.
    pub fn upsert_member(&self, guild_id: &GuildId, user_id: UserId, voice_channel: Option<ChannelId>) {
        if let Some(mut guild) = self.guilds.get_mut(guild_id) {
            guild.members.insert(user_id, MemberState { voice_channel });
        }
    }

    /// Records membership without touching known voice presence.
    fn touch_member(&self, guild_id: &GuildId, user_id: UserId) {
        if let Some(mut guild) = self.guilds.get_mut(guild_id) {
            guild.members.entry(user_id).or_default();
        }
    }

    pub fn remove_member(&self, guild_id: &GuildId, user_id: UserId) {
        if let Some(mut guild) = self.guilds.get_mut(guild_id) {
            guild.members.remove(&user_id);
        }
    }

    pub fn apply(&self, event: &GatewayEvent) {
        match event {
            GatewayEvent::Ready { .. } => {}
            GatewayEvent::GuildAvailable(payload) => {
                let mut entry = GuildEntry {
                    name: payload.name.clone(),
                    ..GuildEntry::default()
                };
                for channel in &payload.channels {
                    if let Some(name) = &channel.name {
                        entry.channels.insert(channel.id, name.clone());
                    }
                }
                for member in &payload.members {
                    entry.members.entry(member.user.id).or_default();
                }
                for state in &payload.voice_states {
                    entry.members.entry(state.user_id).or_default().voice_channel = state.channel_id;
                }
                trace!(
                    "Cached guild {} ({} members, {} channels)",
                    payload.id,
                    entry.members.len(),
                    entry.channels.len()
                );
                self.guilds.insert(payload.id.clone(), entry);
            }
            GatewayEvent::GuildRemoved { guild_id, .. } => self.remove_guild(guild_id),
            GatewayEvent::ChannelUpsert(channel) => {
                if let (Some(guild_id), Some(name)) = (&channel.guild_id, &channel.name) {
                    self.upsert_channel(guild_id, channel.id, name);
                }
            }
            GatewayEvent::MemberUpsert { guild_id, user_id } => self.touch_member(guild_id, *user_id),
            GatewayEvent::MemberRemove { guild_id, user_id } => self.remove_member(guild_id, *user_id),
            GatewayEvent::VoiceStateUpdate { guild_id, state } => {
                self.upsert_member(guild_id, state.user_id, state.channel_id);
            }
            GatewayEvent::VoiceServerUpdate { .. } => {}
        }
    }
}

impl GuildDirectory for MemberCache {
    fn guild_ids(&self) -> Vec<GuildId> {
        let mut ids: Vec<GuildId> = self.guilds.iter().map(|g| g.key().clone()).collect();
        ids.sort();
        ids
    }

    fn member(&self, guild_id: &GuildId, user_id: UserId) -> Option<MemberState> {
        self.guilds
            .get(guild_id)
            .and_then(|guild| guild.members.get(&user_id).copied())
    }

    fn guild_name(&self, guild_id: &GuildId) -> Option<String> {
        self.guilds.get(guild_id).map(|guild| guild.name.clone())
    }

    fn channel_name(&self, guild_id: &GuildId, channel_id: ChannelId) -> Option<String> {
        self.guilds
            .get(guild_id)
            .and_then(|guild| guild.channels.get(&channel_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatch(name: &str, data: serde_json::Value) -> GatewayEvent {
        GatewayEvent::from_dispatch(name, data).unwrap().unwrap()
    }

    #[test]
    fn test_guild_create_populates_directory() {
        let cache = MemberCache::new();
        cache.apply(&dispatch(
            "GUILD_CREATE",
            json!({
                "id": "1",
                "name": "Study Hall",
                "channels": [{ "id": "10", "name": "Focus" }],
                "members": [{ "user": { "id": "42" } }, { "user": { "id": "43" } }],
                "voice_states": [{ "user_id": "42", "channel_id": "10", "session_id": "s" }]
            }),
        ));

        let guild = GuildId::from("1");
        assert_eq!(cache.guild_name(&guild).as_deref(), Some("Study Hall"));
        assert_eq!(cache.channel_name(&guild, ChannelId(10)).as_deref(), Some("Focus"));
        assert_eq!(
            cache.member(&guild, UserId(42)),
            Some(MemberState {
                voice_channel: Some(ChannelId(10))
            })
        );
        assert_eq!(cache.member(&guild, UserId(43)), Some(MemberState::default()));
        assert_eq!(cache.member(&guild, UserId(44)), None);
    }

    #[test]
    fn test_member_update_keeps_voice_presence() {
        let cache = MemberCache::new();
        let guild = GuildId::from("1");
        cache.upsert_guild(guild.clone(), "g");
        cache.upsert_member(&guild, UserId(42), Some(ChannelId(10)));

        cache.apply(&dispatch(
            "GUILD_MEMBER_UPDATE",
            json!({ "guild_id": "1", "user": { "id": "42" }, "roles": [] }),
        ));
        assert_eq!(
            cache.member(&guild, UserId(42)).and_then(|m| m.voice_channel),
            Some(ChannelId(10))
        );

        cache.apply(&dispatch(
            "VOICE_STATE_UPDATE",
            json!({ "guild_id": "1", "user_id": "42", "channel_id": null, "session_id": "s" }),
        ));
        assert_eq!(cache.member(&guild, UserId(42)), Some(MemberState::default()));

        cache.apply(&dispatch(
            "GUILD_MEMBER_REMOVE",
            json!({ "guild_id": "1", "user": { "id": "42" } }),
        ));
        assert_eq!(cache.member(&guild, UserId(42)), None);
    }

    #[test]
    fn test_events_for_unknown_guilds_are_dropped() {
        let cache = MemberCache::new();
        cache.upsert_member(&GuildId::from("9"), UserId(1), None);
        assert!(cache.guild_ids().is_empty());

        cache.upsert_guild(GuildId::from("9"), "g");
        cache.apply(&dispatch("GUILD_DELETE", json!({ "id": "9", "unavailable": true })));
        assert!(cache.guild_ids().is_empty());
    }
}
