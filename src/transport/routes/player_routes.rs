use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, info};

use crate::{
    common::{
        ApiErrorBody,
        types::{GuildId, UserId},
    },
    dispatch::{CommandError, StatusSnapshot},
    server::AppState,
    transport::middleware::{AuthedRequest, RequestMeta},
};

#[derive(Serialize)]
pub struct CommandResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    timestamp: String,
}

impl CommandResponse {
    fn ok(timestamp: String) -> Self {
        Self {
            success: true,
            message: None,
            title: None,
            timestamp,
        }
    }
}

/// A failed command, rendered as `{error, timestamp, userId?}`.
pub struct CommandFailure {
    error: CommandError,
    timestamp: String,
    user_id: Option<String>,
}

impl IntoResponse for CommandFailure {
    fn into_response(self) -> Response {
        let status = match self.error {
            CommandError::MissingCredentials => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut body = ApiErrorBody::new(self.error.to_string(), self.timestamp);
        if let Some(user_id) = self.user_id {
            body = body.with_user(user_id);
        }
        (status, Json(body)).into_response()
    }
}

/// Parsed identity and target of a command request.
struct Command {
    user_id: UserId,
    hint: Option<GuildId>,
}

impl Command {
    fn parse(req: &AuthedRequest) -> Result<Self, CommandError> {
        // A user id that is not a snowflake cannot be a member anywhere.
        let user_id = req
            .user_id
            .parse::<UserId>()
            .map_err(|_| CommandError::UserNotFound)?;
        Ok(Self {
            user_id,
            hint: req.field("guildId").map(GuildId::from),
        })
    }
}

fn fail(op: &str, meta: &RequestMeta, error: CommandError) -> CommandFailure {
    error!("[{}] {} failed: {}", meta.client_ip, op, error);
    CommandFailure {
        error,
        timestamp: meta.timestamp.clone(),
        user_id: None,
    }
}

/// POST /play
pub async fn play(
    State(state): State<Arc<AppState>>,
    Extension(meta): Extension<RequestMeta>,
    Extension(req): Extension<AuthedRequest>,
) -> Result<Json<CommandResponse>, CommandFailure> {
    let query = req.field("query").unwrap_or_default();
    info!("[{}] PLAY \"{}\" for userId={}", meta.client_ip, query, req.user_id);

    let result = match Command::parse(&req) {
        Ok(cmd) => state.dispatcher.play(cmd.user_id, &query, cmd.hint.as_ref()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            info!("[{}] PLAY ok: {}", meta.client_ip, outcome.title);
            Ok(Json(CommandResponse {
                success: true,
                message: Some(format!("Playing: {}", outcome.title)),
                title: Some(outcome.title),
                timestamp: meta.timestamp,
            }))
        }
        Err(e) => {
            let mut failure = fail("PLAY", &meta, e);
            failure.user_id = Some(req.user_id);
            Err(failure)
        }
    }
}

macro_rules! control_route {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        pub async fn $name(
            State(state): State<Arc<AppState>>,
            Extension(meta): Extension<RequestMeta>,
            Extension(req): Extension<AuthedRequest>,
        ) -> Result<Json<CommandResponse>, CommandFailure> {
            info!("[{}] {} for userId={}", meta.client_ip, $label, req.user_id);
            let cmd = Command::parse(&req).map_err(|e| fail($label, &meta, e))?;
            state
                .dispatcher
                .$name(cmd.user_id, cmd.hint.as_ref())
                .await
                .map_err(|e| fail($label, &meta, e))?;
            Ok(Json(CommandResponse::ok(meta.timestamp)))
        }
    };
}

control_route!(
    /// POST /pause
    pause,
    "PAUSE"
);
control_route!(
    /// POST /resume
    resume,
    "RESUME"
);
control_route!(
    /// POST /skip
    skip,
    "SKIP"
);
control_route!(
    /// POST /stop
    stop,
    "STOP"
);

/// POST /status
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(req): Extension<AuthedRequest>,
) -> Json<StatusSnapshot> {
    let snapshot = match Command::parse(&req) {
        Ok(cmd) => state.dispatcher.status(cmd.user_id, cmd.hint.as_ref()).await,
        Err(e) => StatusSnapshot::disconnected(None).with_error(e.to_string()),
    };
    Json(snapshot)
}
