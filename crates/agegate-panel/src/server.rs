//! Panel HTTP server lifecycle.
//!
//! [`start_server`] binds and serves in one call. [`bind`] and [`serve`]
//! are split out so callers (and tests) can bind port 0 and learn the real
//! address before serving.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use agegate_core::config::PanelConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Address the panel listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// IP address to bind, e.g. `0.0.0.0`.
    pub host: String,
    /// TCP port; 0 picks a free one.
    pub port: u16,
}

impl ServerConfig {
    /// Resolve the configured host and port.
    ///
    /// # Errors
    ///
    /// [`ServerError::Bind`] when `host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ServerError::Bind(format!("invalid host {:?}: {e}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&PanelConfig::default())
    }
}

impl From<&PanelConfig> for ServerConfig {
    fn from(config: &PanelConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Bind the panel's listener.
///
/// # Errors
///
/// [`ServerError::Bind`] for an invalid host or a port already in use.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the panel on `listener` until `shutdown` completes, then let
/// in-flight requests finish.
///
/// Open `WebSocket` streams end when the controller stops, so shut the
/// controller down first for a prompt exit.
///
/// # Errors
///
/// [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Panel server listening");
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    info!("Panel server stopped");
    Ok(())
}

/// Bind with `config` and serve until `shutdown` completes.
///
/// # Errors
///
/// See [`bind`] and [`serve`].
pub async fn start_server<F>(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}

/// Errors from starting or running the panel server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// Serving failed after the listener was bound.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agegate_core::{AgeController, AgeEventChannel, ControllerConfig, MemoryStore};

    #[test]
    fn server_config_follows_panel_config() {
        let panel = PanelConfig {
            port: 9090,
            ..PanelConfig::default()
        };
        let config = ServerConfig::from(&panel);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(
            config.socket_addr().unwrap(),
            SocketAddr::from(([0, 0, 0, 0], 9090))
        );
    }

    #[test]
    fn hostnames_are_not_resolved() {
        let config = ServerConfig {
            host: "localhost".to_owned(),
            port: 8080,
        };
        assert!(matches!(config.socket_addr(), Err(ServerError::Bind(_))));
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let channel = AgeEventChannel::new("CY_FACE_AGE_RESULT", 4);
        let controller = AgeController::spawn(
            &channel,
            Arc::new(MemoryStore::new()),
            ControllerConfig::default(),
        );
        let state = Arc::new(AppState::new(controller, channel));

        let listener = bind(&ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
        })
        .await
        .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, state, async move {
            let _ = stop_rx.await;
        }));
        stop_tx.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }
}
