use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    common::{ApiErrorBody, iso_timestamp},
    dispatch::CommandError,
    server::AppState,
};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Per-request context, available to every handler.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub timestamp: String,
    pub client_ip: String,
}

/// Body of an authenticated command request.
#[derive(Debug, Clone)]
pub struct AuthedRequest {
    pub user_id: String,
    pub bot_id: String,
    pub body: Value,
}

impl AuthedRequest {
    /// A string field of the body. Numbers are accepted as their text form.
    pub fn field(&self, name: &str) -> Option<String> {
        field_text(&self.body, name)
    }
}

fn field_text(body: &Value, name: &str) -> Option<String> {
    match body.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn client_ip(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn request_context(mut req: Request, next: Next) -> Response {
    let meta = RequestMeta {
        timestamp: iso_timestamp(),
        client_ip: client_ip(&req),
    };
    debug!("[{}] {} {}", meta.client_ip, req.method(), req.uri().path());
    req.extensions_mut().insert(meta);
    next.run(req).await
}

fn unauthorized(message: &str, timestamp: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorBody::new(message, timestamp).with_required(vec!["userId", "botId"])),
    )
        .into_response()
}

/// GET and pre-flight requests pass through. Anything else must carry
/// `userId` and `botId` in its JSON body.
pub async fn require_credentials(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }

    let meta = req.extensions().get::<RequestMeta>().cloned();
    let timestamp = meta
        .as_ref()
        .map(|m| m.timestamp.clone())
        .unwrap_or_else(iso_timestamp);
    let client_ip = meta.map(|m| m.client_ip).unwrap_or_default();

    let (mut parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("[{}] Unreadable request body: {}", client_ip, e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorBody::new("Invalid request body", timestamp)),
            )
                .into_response();
        }
    };
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let (Some(user_id), Some(bot_id)) = (field_text(&body, "userId"), field_text(&body, "botId")) else {
        warn!("[{}] Auth failed on {}: missing credentials", client_ip, parts.uri.path());
        return unauthorized(&CommandError::MissingCredentials.to_string(), &timestamp);
    };

    if let Some(expected) = &state.config.server.bot_id {
        if *expected != bot_id {
            warn!("[{}] Auth failed on {}: unknown botId {}", client_ip, parts.uri.path(), bot_id);
            return unauthorized("Invalid botId", &timestamp);
        }
    }

    info!(
        "[{}] {} {} userId={} botId={}",
        client_ip,
        parts.method,
        parts.uri.path(),
        user_id,
        bot_id
    );
    parts.extensions.insert(AuthedRequest {
        user_id,
        bot_id,
        body,
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

pub async fn add_response_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.headers_mut().insert(
        "Tunedeck-Version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}
