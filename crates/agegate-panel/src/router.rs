//! Axum router construction for the panel.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`] with
//! CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the panel server.
///
/// The router includes:
/// - `GET /` -- HTML panel
/// - `GET /ws/display` -- `WebSocket` session view stream
/// - `GET /api/display` -- current session view
/// - `PUT /api/session/name` -- replace the identity label
/// - `POST /api/session/focus` -- identity field focused
/// - `POST /api/session/blur` -- identity field blurred
/// - `GET /api/health` -- liveness
///
/// CORS allows any origin so the panel can be embedded by kiosk front
/// ends served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws/display", get(ws::ws_display))
        .route("/api/display", get(handlers::get_display))
        .route("/api/session/name", put(handlers::put_name))
        .route("/api/session/focus", post(handlers::focus))
        .route("/api/session/blur", post(handlers::blur))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
