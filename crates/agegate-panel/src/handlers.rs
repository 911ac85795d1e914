//! REST endpoint handlers for the panel server.
//!
//! Reads come from the controller's published session view; identity
//! edits are forwarded to the controller as commands and applied in order
//! with age events.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML panel |
//! | `GET` | `/api/display` | Current session view |
//! | `PUT` | `/api/session/name` | Replace the identity label |
//! | `POST` | `/api/session/focus` | Identity field gained focus |
//! | `POST` | `/api/session/blur` | Identity field lost focus |
//! | `GET` | `/api/health` | Liveness and channel listener count |

use std::sync::Arc;

use agegate_types::SessionView;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};

use crate::error::PanelError;
use crate::state::AppState;

/// Longest identity label accepted, in characters.
pub const MAX_NAME_CHARS: usize = 128;

/// Lower and upper ends of the panel's age indicator.
const INDICATOR_MIN: i64 = 1;
const INDICATOR_MAX: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PUT /api/session/name`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameRequest {
    /// The full contents of the identity field.
    pub user_name: String,
}

/// Response for identity commands.
#[derive(Debug, serde::Serialize)]
struct CommandResponse {
    /// Whether the command was queued.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl CommandResponse {
    fn queued(message: &str) -> (StatusCode, Json<Self>) {
        (
            StatusCode::ACCEPTED,
            Json(Self {
                ok: true,
                message: message.to_owned(),
            }),
        )
    }
}

/// Response for `GET /api/health`.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    controller_running: bool,
    channel: String,
    listeners: usize,
    uptime_seconds: i64,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML panel
// ---------------------------------------------------------------------------

/// Serve the HTML panel: identity field, decade bounds and indicator.
///
/// The page keeps itself current through `/ws/display`.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(render_panel(&state.controller.view()))
}

fn render_panel(view: &SessionView) -> String {
    let user_name = escape_html(&view.user_name);
    let lower = view.bucket.lower;
    let upper = view.bucket.upper;
    let indicator = view.bucket.value.clamp(INDICATOR_MIN, INDICATOR_MAX);
    let cooldown = if view.cooldown { "cooldown" } else { "ready" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Age Gate</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 640px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; font-size: 1.25rem; }}
        input[type=text] {{
            background: #161b22;
            color: #c9d1d9;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 0.5rem;
            width: 100%;
        }}
        .range {{ display: flex; align-items: center; gap: 1rem; margin: 1.5rem 0 0.5rem; }}
        .range input {{ flex: 1; }}
        .age {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; min-width: 3ch; }}
        .title {{ color: #8b949e; }}
        .status {{ color: #8b949e; font-size: 0.85rem; margin-top: 2rem; }}
    </style>
</head>
<body>
    <h1>Age Component</h1>
    <input type="text" id="userName" value="{user_name}" placeholder="Enter your name">
    <div class="range">
        <span class="age" id="ageMin">{lower}</span>
        <input type="range" id="ageValue" min="{INDICATOR_MIN}" max="{INDICATOR_MAX}" value="{indicator}" disabled>
        <span class="age" id="ageMax">{upper}</span>
    </div>
    <span class="title">Likely Age</span>
    <p class="status">Gate: <span id="gate">{cooldown}</span></p>
    <script>{PANEL_SCRIPT}</script>
</body>
</html>"#
    )
}

/// Client glue: forwards identity field events and applies view updates.
const PANEL_SCRIPT: &str = r#"
const field = document.getElementById("userName");
const send = (method, path, body) => fetch(path, {
    method,
    headers: { "content-type": "application/json" },
    body: body === undefined ? undefined : JSON.stringify(body),
});
field.addEventListener("input", () => send("PUT", "/api/session/name", { userName: field.value }));
field.addEventListener("focus", () => send("POST", "/api/session/focus"));
field.addEventListener("blur", () => send("POST", "/api/session/blur"));
const ws = new WebSocket(`${location.protocol === "https:" ? "wss" : "ws"}://${location.host}/ws/display`);
ws.onmessage = (msg) => {
    const view = JSON.parse(msg.data);
    document.getElementById("ageMin").textContent = view.bucket.lower;
    document.getElementById("ageMax").textContent = view.bucket.upper;
    document.getElementById("ageValue").value = Math.min(100, Math.max(1, view.bucket.value));
    document.getElementById("gate").textContent = view.cooldown ? "cooldown" : "ready";
};
"#;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// GET /api/display
// ---------------------------------------------------------------------------

/// Return the current session view.
pub async fn get_display(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(state.controller.view())
}

// ---------------------------------------------------------------------------
// Identity field commands
// ---------------------------------------------------------------------------

/// Replace the identity label. Marks the field as being edited.
pub async fn put_name(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NameRequest>,
) -> Result<impl IntoResponse, PanelError> {
    if body.user_name.chars().count() > MAX_NAME_CHARS {
        return Err(PanelError::InvalidRequest(format!(
            "userName must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    state.controller.edit_name(body.user_name).await?;
    Ok(CommandResponse::queued("Identity label updated"))
}

/// The identity field gained focus.
pub async fn focus(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, PanelError> {
    state.controller.focus().await?;
    Ok(CommandResponse::queued("Identity field focused"))
}

/// The identity field lost focus.
pub async fn blur(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, PanelError> {
    state.controller.blur().await?;
    Ok(CommandResponse::queued("Identity field blurred"))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Liveness: whether the controller runs and how many listeners the
/// channel has.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let controller_running = state.controller.is_running();
    let status = if controller_running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthResponse {
        status: if controller_running { "ok" } else { "stopped" },
        controller_running,
        channel: state.channel.name().to_owned(),
        listeners: state.channel.listener_count(),
        uptime_seconds: state.uptime_seconds(),
    };
    (status, Json(body))
}
