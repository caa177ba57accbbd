use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    common::{ApiErrorBody, banner::ENDPOINTS, host::ServerInfo},
    server::AppState,
    transport::middleware::RequestMeta,
};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    server: ServerInfo,
    /// Seconds since startup.
    uptime: f64,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    timestamp: String,
    port: u16,
    hostname: String,
    platform: &'static str,
    api_urls: Vec<String>,
    primary_url: String,
    external_urls: Vec<String>,
}

/// GET /health
pub async fn health(
    State(state): State<Arc<AppState>>,
    Extension(meta): Extension<RequestMeta>,
) -> Json<HealthResponse> {
    debug!("[{}] HEALTH CHECK", meta.client_ip);
    Json(HealthResponse {
        status: "OK",
        timestamp: meta.timestamp,
        server: state.server_info.clone(),
        uptime: state.uptime_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /info
pub async fn info(
    State(state): State<Arc<AppState>>,
    Extension(meta): Extension<RequestMeta>,
) -> Json<InfoResponse> {
    let port = state.config.server.port;
    let server = &state.server_info;
    let api_urls = server.api_urls(port);

    Json(InfoResponse {
        timestamp: meta.timestamp,
        port,
        hostname: server.hostname.clone(),
        platform: server.platform,
        primary_url: api_urls.first().cloned().unwrap_or_default(),
        api_urls,
        external_urls: server.external_urls(port),
    })
}

/// Fallback for unmatched routes.
pub async fn not_found(
    method: Method,
    uri: Uri,
    Extension(meta): Extension<RequestMeta>,
) -> impl IntoResponse {
    warn!("[{}] 404: {} {}", meta.client_ip, method, uri);
    let endpoints = ENDPOINTS.iter().map(|(_, path, _)| *path).collect();
    (
        StatusCode::NOT_FOUND,
        Json(ApiErrorBody::new("Endpoint not found", meta.timestamp).with_endpoints(endpoints)),
    )
}
