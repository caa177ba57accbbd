use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::types::{AnyResult, ChannelId, GuildId, UserId};

/// Raw frame as delivered by the chat-platform gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayFrame {
    pub op: u8,
    #[serde(default)]
    pub t: Option<String>,
    #[serde(default)]
    pub d: Value,
}

/// Gateway op code for dispatched events.
pub const OP_DISPATCH: u8 = 0;
/// Gateway op code for voice state updates sent by the bot.
pub const OP_VOICE_STATE_UPDATE: u8 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct PartialUser {
    pub id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    pub user: PartialUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPayload {
    pub id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceStatePayload {
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    pub channel_id: Option<ChannelId>,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildPayload {
    pub id: GuildId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelPayload>,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub voice_states: Vec<VoiceStatePayload>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReadyPayload {
    user: PartialUser,
}

#[derive(Debug, Clone, Deserialize)]
struct GuildDeletePayload {
    id: GuildId,
    #[serde(default)]
    unavailable: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct MemberEventPayload {
    guild_id: GuildId,
    user: PartialUser,
}

#[derive(Debug, Clone, Deserialize)]
struct VoiceServerPayload {
    guild_id: GuildId,
    token: String,
    endpoint: Option<String>,
}

/// Gateway dispatches the service cares about.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready {
        user_id: UserId,
    },
    GuildAvailable(GuildPayload),
    GuildRemoved {
        guild_id: GuildId,
        unavailable: bool,
    },
    ChannelUpsert(ChannelPayload),
    MemberUpsert {
        guild_id: GuildId,
        user_id: UserId,
    },
    MemberRemove {
        guild_id: GuildId,
        user_id: UserId,
    },
    VoiceStateUpdate {
        guild_id: GuildId,
        state: VoiceStatePayload,
    },
    VoiceServerUpdate {
        guild_id: GuildId,
        token: String,
        endpoint: Option<String>,
    },
}

impl GatewayEvent {
    /// Maps a dispatch name and payload to an event. Dispatches we do not
    /// track yield `None`.
    pub fn from_dispatch(name: &str, data: Value) -> AnyResult<Option<Self>> {
        let event = match name {
            "READY" => {
                let ready: ReadyPayload = serde_json::from_value(data)?;
                Self::Ready {
                    user_id: ready.user.id,
                }
            }
            "GUILD_CREATE" => Self::GuildAvailable(serde_json::from_value(data)?),
            "GUILD_DELETE" => {
                let deleted: GuildDeletePayload = serde_json::from_value(data)?;
                Self::GuildRemoved {
                    guild_id: deleted.id,
                    unavailable: deleted.unavailable,
                }
            }
            "CHANNEL_CREATE" | "CHANNEL_UPDATE" => {
                let channel: ChannelPayload = serde_json::from_value(data)?;
                if channel.guild_id.is_none() {
                    return Ok(None);
                }
                Self::ChannelUpsert(channel)
            }
            "GUILD_MEMBER_ADD" | "GUILD_MEMBER_UPDATE" => {
                let member: MemberEventPayload = serde_json::from_value(data)?;
                Self::MemberUpsert {
                    guild_id: member.guild_id,
                    user_id: member.user.id,
                }
            }
            "GUILD_MEMBER_REMOVE" => {
                let member: MemberEventPayload = serde_json::from_value(data)?;
                Self::MemberRemove {
                    guild_id: member.guild_id,
                    user_id: member.user.id,
                }
            }
            "VOICE_STATE_UPDATE" => {
                let state: VoiceStatePayload = serde_json::from_value(data)?;
                let Some(guild_id) = state.guild_id.clone() else {
                    return Ok(None);
                };
                Self::VoiceStateUpdate { guild_id, state }
            }
            "VOICE_SERVER_UPDATE" => {
                let server: VoiceServerPayload = serde_json::from_value(data)?;
                Self::VoiceServerUpdate {
                    guild_id: server.guild_id,
                    token: server.token,
                    endpoint: server.endpoint,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Parses a full gateway frame. Non-dispatch frames yield `None`.
    pub fn from_frame(text: &str) -> AnyResult<Option<Self>> {
        let frame: GatewayFrame = serde_json::from_str(text)?;
        match (frame.op, frame.t) {
            (OP_DISPATCH, Some(name)) => Self::from_dispatch(&name, frame.d),
            _ => Ok(None),
        }
    }
}

/// Commands the service asks the gateway connection to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    VoiceStateUpdate {
        guild_id: GuildId,
        channel_id: Option<ChannelId>,
        self_mute: bool,
        self_deaf: bool,
    },
}

#[derive(Serialize)]
struct OutgoingFrame<T> {
    op: u8,
    d: T,
}

#[derive(Serialize)]
struct VoiceStateData<'a> {
    guild_id: &'a GuildId,
    channel_id: Option<ChannelId>,
    self_mute: bool,
    self_deaf: bool,
}

impl GatewayCommand {
    /// Joins `channel_id`, deafened.
    pub fn join(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self::VoiceStateUpdate {
            guild_id,
            channel_id: Some(channel_id),
            self_mute: false,
            self_deaf: true,
        }
    }

    pub fn leave(guild_id: GuildId) -> Self {
        Self::VoiceStateUpdate {
            guild_id,
            channel_id: None,
            self_mute: false,
            self_deaf: false,
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        match self {
            Self::VoiceStateUpdate { guild_id, .. } => guild_id,
        }
    }

    pub fn to_payload(&self) -> AnyResult<String> {
        match self {
            Self::VoiceStateUpdate {
                guild_id,
                channel_id,
                self_mute,
                self_deaf,
            } => Ok(serde_json::to_string(&OutgoingFrame {
                op: OP_VOICE_STATE_UPDATE,
                d: VoiceStateData {
                    guild_id,
                    channel_id: *channel_id,
                    self_mute: *self_mute,
                    self_deaf: *self_deaf,
                },
            })?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_guild_create_parses_members_and_voice() {
        let frame = json!({
            "op": 0,
            "t": "GUILD_CREATE",
            "s": 3,
            "d": {
                "id": "100",
                "name": "Lofi Lounge",
                "channels": [{ "id": "200", "name": "Chill", "type": 2 }],
                "members": [{ "user": { "id": "42", "username": "someone" }, "roles": [] }],
                "voice_states": [{ "user_id": "42", "channel_id": "200", "session_id": "s1" }]
            }
        });

        let event = GatewayEvent::from_frame(&frame.to_string()).unwrap().unwrap();
        let GatewayEvent::GuildAvailable(guild) = event else {
            panic!("expected GuildAvailable");
        };
        assert_eq!(guild.id, GuildId::from("100"));
        assert_eq!(guild.members[0].user.id, UserId(42));
        assert_eq!(guild.voice_states[0].channel_id, Some(ChannelId(200)));
        assert_eq!(guild.channels[0].name.as_deref(), Some("Chill"));
    }

    #[test]
    fn test_voice_state_leave_has_no_channel() {
        let event = GatewayEvent::from_dispatch(
            "VOICE_STATE_UPDATE",
            json!({ "guild_id": "1", "user_id": "42", "channel_id": null, "session_id": "s" }),
        )
        .unwrap();

        assert!(matches!(
            event,
            Some(GatewayEvent::VoiceStateUpdate { state, .. }) if state.channel_id.is_none()
        ));
    }

    #[test]
    fn test_untracked_frames_are_skipped() {
        assert!(GatewayEvent::from_frame(r#"{"op":11}"#).unwrap().is_none());
        assert!(
            GatewayEvent::from_dispatch("TYPING_START", json!({}))
                .unwrap()
                .is_none()
        );
        assert!(GatewayEvent::from_frame("{").is_err());
    }

    #[test]
    fn test_join_payload() {
        let payload = GatewayCommand::join(GuildId::from("1"), ChannelId(2))
            .to_payload()
            .unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "op": 4,
                "d": { "guild_id": "1", "channel_id": "2", "self_mute": false, "self_deaf": true }
            })
        );
    }

    #[test]
    fn test_leave_payload_has_null_channel() {
        let payload = GatewayCommand::leave(GuildId::from("1")).to_payload().unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert!(value["d"]["channel_id"].is_null());
    }
}
