//! Axum router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the observer server.
///
/// The router includes:
/// - `GET /` -- plain-text status
/// - `GET /ws`, `GET /ws/{world}` -- `WebSocket` session transport
/// - `GET /api/civilization`, `GET /api/civilization/{world}` -- sanity
/// - `GET /api/status/{world}` -- session status
///
/// CORS allows any origin so browser observers can be served from
/// anywhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws", get(ws::ws_default))
        .route("/ws/{world}", get(ws::ws_world))
        .route("/api/civilization", get(handlers::civilization))
        .route("/api/civilization/{world}", get(handlers::civilization_for))
        .route("/api/status/{world}", get(handlers::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
