//! Error types for the daemon binary.
//!
//! [`DaemonError`] is the top-level error type that wraps all possible
//! failure modes during startup and while the session runs.

/// Top-level error for the daemon binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: agegate_core::ConfigError,
    },

    /// The reading store could not be prepared.
    #[error("database error: {source}")]
    Database {
        /// The underlying data layer error.
        #[from]
        source: agegate_db::DbError,
    },

    /// NATS connection or subscription failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// The panel server failed to start or stopped with an error.
    #[error("panel error: {source}")]
    Panel {
        /// The underlying server error.
        #[from]
        source: agegate_panel::ServerError,
    },

    /// The logging subscriber could not be configured.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
