//! Session daemon for agegate.
//!
//! Wires the sensor bridge, the age controller, the reading store and the
//! operator panel together for a single session, then runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `AGEGATE_CONFIG` or `agegate-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the age event channel
//! 4. Open the reading store and run migrations
//! 5. Spawn the age controller
//! 6. Bridge the sensor's NATS subject into the channel
//! 7. Start the operator panel
//! 8. Wait for Ctrl-C, then stop the controller and the panel and close
//!    the pool

mod error;
mod nats_bridge;
mod session_store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agegate_core::config::{LogFormat, LoggingConfig, StoreBackend};
use agegate_core::{AgeController, AgeEventChannel, AgegateConfig, ControllerConfig, MemoryStore};
use agegate_db::{PgReadingStore, PostgresConfig, PostgresPool};
use agegate_panel::{AppState, ServerConfig, start_server};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::DaemonError;
use crate::nats_bridge::NatsBridge;
use crate::session_store::SessionStore;

/// Config file used when `AGEGATE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "agegate-config.yaml";

/// Application entry point for the session daemon.
///
/// # Errors
///
/// Returns an error if any initialization step fails or the panel server
/// stops with an error.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so it comes first.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("agegate-daemon starting");
    info!(
        source = %config_source.display(),
        channel = config.channel.name,
        identity_required = config.gate.identity_required,
        cooldown_enabled = config.gate.cooldown_enabled,
        debounce_ms = config.debounce.delay_ms,
        backend = ?config.store.backend,
        "Configuration loaded"
    );

    // 3. Create the inbound channel.
    let channel = AgeEventChannel::new(&config.channel.name, config.channel.capacity);

    // 4. Open the reading store.
    let (store, pool) = open_store(&config).await?;
    info!(backend = agegate_core::ReadingStore::backend(&store), "Reading store ready");

    // 5. Spawn the controller.
    let controller = AgeController::spawn(
        &channel,
        Arc::new(store),
        ControllerConfig::from_config(&config),
    );

    // 6. Bridge the sensor subject.
    let bridge_task = if config.infrastructure.nats_enabled {
        let bridge =
            NatsBridge::connect(&config.infrastructure.nats_url, config.channel.subject()).await?;
        Some(bridge.spawn(channel.clone()).await?)
    } else {
        info!("NATS bridge disabled, events arrive only from in-process publishers");
        None
    };

    // 7. Start the operator panel.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut panel_task = if config.panel.enabled {
        let state = Arc::new(AppState::new(controller.clone(), channel.clone()));
        let server_config = ServerConfig::from(&config.panel);
        let shutdown = async move {
            let mut rx = shutdown_rx;
            let _ = rx.wait_for(|stop| *stop).await;
        };
        Some(tokio::spawn(async move {
            start_server(&server_config, state, shutdown).await
        }))
    } else {
        info!("Operator panel disabled");
        None
    };

    // 8. Run until Ctrl-C, the controller stops, or the panel fails.
    let mut failure: Option<DaemonError> = None;
    let mut panel_finished = false;
    let panel_done = async {
        match panel_task.as_mut() {
            Some(task) => task.await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Ctrl-C received, shutting down"),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, shutting down"),
            }
        }
        () = controller.stopped() => {
            warn!("controller stopped unexpectedly");
        }
        outcome = panel_done => {
            match outcome {
                Ok(Ok(())) => info!("panel server stopped"),
                Ok(Err(e)) => failure = Some(DaemonError::from(e)),
                Err(e) => warn!(error = %e, "panel server task failed"),
            }
            panel_finished = true;
        }
    }
    if panel_finished {
        panel_task = None;
    }

    shutdown_tx.send_replace(true);
    controller.shutdown().await;
    if let Some(task) = bridge_task {
        task.abort();
    }
    if let Some(task) = panel_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failure = Some(DaemonError::from(e)),
            Err(e) => warn!(error = %e, "panel server task failed"),
        }
    }

    if let Some(pool) = pool {
        pool.close().await;
    }

    if let Some(e) = failure {
        error!(error = %e, "agegate-daemon stopped with an error");
        return Err(e.into());
    }
    info!("agegate-daemon shutdown complete");
    Ok(())
}

/// Load configuration from `AGEGATE_CONFIG`, or `agegate-config.yaml` in the
/// working directory.
///
/// A missing default file means defaults plus environment overrides; a
/// missing file named by `AGEGATE_CONFIG` is an error.
fn load_config() -> Result<(AgegateConfig, PathBuf), DaemonError> {
    if let Ok(path) = std::env::var("AGEGATE_CONFIG") {
        let path = PathBuf::from(path);
        let config = AgegateConfig::from_file(&path)?;
        return Ok((config, path));
    }
    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        Ok((AgegateConfig::from_file(path)?, path.to_path_buf()))
    } else {
        Ok((AgegateConfig::parse("")?, PathBuf::from("<defaults>")))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &LoggingConfig) -> Result<(), DaemonError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| DaemonError::Logging {
            message: format!("invalid log filter {:?}: {e}", config.level),
        })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| DaemonError::Logging {
        message: e.to_string(),
    })
}

/// Open the configured reading store, along with the pool to close at exit
/// when it is database-backed.
async fn open_store(
    config: &AgegateConfig,
) -> Result<(SessionStore, Option<PostgresPool>), DaemonError> {
    match config.store.backend {
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL");
            let pool_config = PostgresConfig::from_infrastructure(&config.infrastructure);
            let pool = PostgresPool::connect(&pool_config).await?;
            pool.run_migrations().await?;
            info!("Migrations applied");
            let store = PgReadingStore::new(&pool, config.store.collection.clone());
            Ok((SessionStore::Postgres(store), Some(pool)))
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store, readings are lost on exit");
            Ok((SessionStore::Memory(MemoryStore::new()), None))
        }
    }
}
