//! Axum router setup

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    ServerConfig, ServerState,
    handlers::{analyze, get_graph, health_check, list_targets},
    websocket::ws_handler,
};

/// CORS for the configured extra origins only; browsers on any other
/// origin get no `access-control-allow-origin`.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin {:?}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    let cors = cors_layer(&state.config.server);
    Router::new()
        // Change feed
        .route("/ws", get(ws_handler))
        // REST API endpoints
        .route("/api/health", get(health_check))
        .route("/api/targets", get(list_targets))
        .route("/api/graph", get(get_graph))
        .route("/api/analyze", post(analyze))
        .layer(cors)
        .with_state(state)
}
