//! `WebSocket` stream of session view updates.
//!
//! Clients connect to `GET /ws/display` and receive the current
//! [`SessionView`] as a JSON text frame, then one frame per published
//! change. Intermediate views may be skipped when the client is slow; the
//! latest view is always delivered.

use std::sync::Arc;

use agegate_types::SessionView;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming session views.
///
/// # Route
///
/// `GET /ws/display`
pub async fn ws_display(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Send `view` as a text frame. Returns `false` once the client is gone.
async fn send_view(socket: &mut WebSocket, view: &SessionView) -> bool {
    let json = match serde_json::to_string(view) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize session view: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut rx = state.controller.watch();
    let initial = rx.borrow_and_update().clone();
    if !send_view(&mut socket, &initial).await {
        debug!("WebSocket client disconnected (send failed)");
        return;
    }

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    debug!("Controller stopped, closing WebSocket");
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                }
                let view = rx.borrow_and_update().clone();
                if !send_view(&mut socket, &view).await {
                    debug!("WebSocket client disconnected (send failed)");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Identity edits go through the REST endpoints.
                    }
                }
            }
        }
    }
}
