//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{ConsoleConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::seed::Seed;
use axum::Router;
use console_storage::{ConsoleStorage, InMemoryConsoleStorage};
use package_gate::GatePolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

/// Console daemon server
pub struct Server {
    config: ConsoleConfig,
    storage: Arc<dyn ConsoleStorage>,
}

impl Server {
    /// Open storage and apply the seed fixture, if any
    pub async fn new(config: ConsoleConfig) -> DaemonResult<Self> {
        let storage: Arc<dyn ConsoleStorage> = match &config.storage {
            StorageConfig::Memory => Arc::new(InMemoryConsoleStorage::new()),
            StorageConfig::File { path } => Arc::new(InMemoryConsoleStorage::open(path)?),
        };

        if let Some(path) = &config.seed_path {
            tracing::info!(path = %path.display(), "Loading seed fixture");
            Seed::load(path)?.apply(storage.as_ref()).await?;
        }

        Ok(Self { config, storage })
    }

    /// The full application: routes plus server-level layers
    pub fn app(&self) -> Router {
        let state = AppState::new(
            self.storage.clone(),
            GatePolicy {
                min_reason_length: self.config.package.min_reason_length,
            },
        );

        let mut app = create_router(state).layer(TimeoutLayer::new(Duration::from_secs(
            self.config.server.request_timeout_secs,
        )));
        if self.config.server.enable_cors {
            app = app.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }
        app
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = self.app();

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Console daemon listening on {}", addr);
        match &self.config.storage {
            StorageConfig::Memory => tracing::info!("Storage: in-memory"),
            StorageConfig::File { path } => {
                tracing::info!("Storage: snapshot file {}", path.display())
            }
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Console daemon shutting down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
