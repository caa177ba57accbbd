use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    server::AppState,
    transport::{
        middleware::{add_response_headers, request_context, require_credentials},
        routes::{gateway, player, stats},
    },
};

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("userid"),
            HeaderName::from_static("botid"),
        ])
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(stats::health))
        .route("/info", get(stats::info))
        .route("/play", post(player::play))
        .route("/pause", post(player::pause))
        .route("/resume", post(player::resume))
        .route("/skip", post(player::skip))
        .route("/stop", post(player::stop))
        .route("/status", post(player::status));

    if state.config.gateway.password.is_some() {
        router = router.route("/gateway", get(gateway::gateway_socket));
    }

    router
        .fallback(stats::not_found)
        .method_not_allowed_fallback(stats::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_credentials))
        .layer(middleware::from_fn(request_context))
        .layer(middleware::from_fn(add_response_headers))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
