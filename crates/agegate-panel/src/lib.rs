//! Operator panel for the agegate display.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **HTML panel** (`GET /`) with the identity field, the decade bounds
//!   and the age indicator
//! - **REST endpoints** for the identity field (edit, focus, blur), the
//!   current session view and health
//! - **`WebSocket` endpoint** (`/ws/display`) streaming every published
//!   session view
//!
//! # Architecture
//!
//! The panel never owns session state. It reads the controller's
//! published view and forwards identity input as controller commands, so
//! edits and age events are applied in one order by one task.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::PanelError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, bind, serve, start_server};
pub use state::AppState;
