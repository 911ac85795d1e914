//! Shared application state for the panel server.
//!
//! [`AppState`] holds a handle to the running controller and the event
//! channel it listens on. Handlers never touch controller state directly:
//! reads come from the published [`SessionView`](agegate_types::SessionView)
//! and writes go through the handle's command queue.

use agegate_core::{AgeEventChannel, ControllerHandle};
use chrono::{DateTime, Utc};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Handle to the session's controller.
    pub controller: ControllerHandle,
    /// The inbound age event channel, for health reporting.
    pub channel: AgeEventChannel,
    /// When the panel state was created.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state for a running controller.
    pub fn new(controller: ControllerHandle, channel: AgeEventChannel) -> Self {
        Self {
            controller,
            channel,
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the panel state was created.
    pub fn uptime_seconds(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }
}
