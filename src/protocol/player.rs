use serde::{Deserialize, Serialize};

/// Body for `PATCH /v4/sessions/{sessionId}/players/{guildId}`.
/// Absent fields leave the player untouched.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<PlayerUpdateTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceState>,
}

impl PlayerUpdate {
    pub fn play(encoded: &str) -> Self {
        Self {
            track: Some(PlayerUpdateTrack {
                encoded: Some(encoded.to_string()),
            }),
            paused: Some(false),
            voice: None,
        }
    }

    pub fn stop() -> Self {
        Self {
            track: Some(PlayerUpdateTrack { encoded: None }),
            ..Self::default()
        }
    }

    pub fn paused(paused: bool) -> Self {
        Self {
            paused: Some(paused),
            ..Self::default()
        }
    }

    pub fn voice(voice: VoiceState) -> Self {
        Self {
            voice: Some(voice),
            ..Self::default()
        }
    }
}

/// `encoded: null` stops the current track.
#[derive(Debug, Default, Serialize)]
pub struct PlayerUpdateTrack {
    pub encoded: Option<String>,
}

/// Voice credentials forwarded from the chat gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    pub token: String,
    pub endpoint: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Error body the node returns on failed REST calls.
#[derive(Debug, Deserialize)]
pub struct NodeErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}
