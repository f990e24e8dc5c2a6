//! Gateway lifecycle - assembly, serving, and orderly shutdown.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::info;

use crate::auth::KeyValidator;
use crate::backend::{BackendClient, BackendClientConfig};
use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::keystore::{KeyStore, SqliteKeyStore};
use crate::pipeline::VerificationPipeline;
use crate::routing::BackendRouter;
use crate::server::{build_router, AppState};

/// Builder for constructing a gateway.
pub struct GatewayBuilder {
    config: GatewayConfig,
}

impl GatewayBuilder {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Assemble the gateway: open the key store, bootstrap the admin
    /// credential, and wire the pipeline collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the key store or backend client fails to
    /// initialize.
    pub async fn build(self) -> Result<RunningGateway> {
        info!(
            bind_addr = %self.config.bind_addr,
            backend_url = %self.config.backend_url,
            models = self.config.routes.len(),
            "building verify-gateway"
        );

        let keystore = Arc::new(SqliteKeyStore::open(&self.config.db_path)?);
        if !self.config.admin_api_key.is_empty() {
            keystore
                .ensure_admin_key(&self.config.admin_hotkey, &self.config.admin_api_key)
                .await?;
        }

        let backend = BackendClient::new(&BackendClientConfig {
            base_url: self.config.backend_url.clone(),
            timeout: self.config.verify_timeout(),
        })?;

        let cache = ResponseCache::new();
        let store: Arc<dyn KeyStore> = keystore;
        let validator = KeyValidator::new(store.clone());
        let pipeline = VerificationPipeline::new(
            validator.clone(),
            BackendRouter::new(self.config.routes.clone()),
            cache.clone(),
            backend,
            self.config.cache_ttl(),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(AppState {
            pipeline,
            validator,
            keystore: store,
            started_at: Instant::now(),
        });

        Ok(RunningGateway {
            config: self.config,
            cache,
            state,
            shutdown_tx,
            shutdown_rx,
        })
    }
}

/// An assembled gateway ready to serve.
pub struct RunningGateway {
    config: GatewayConfig,
    cache: ResponseCache,
    state: Arc<AppState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RunningGateway {
    /// Address the gateway is configured to listen on.
    #[must_use]
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        self.config.bind_addr
    }

    /// Shared handler state, exposed for test harnesses.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Serve until ctrl-c or [`shutdown`](Self::shutdown).
    ///
    /// Spawns the cache sweeper for the lifetime of the server; the sweeper
    /// watches the same shutdown channel, so it never holds the process
    /// open once serving stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server fails.
    pub async fn run(self) -> Result<()> {
        let sweeper = self.cache.spawn_sweeper(
            self.config.cache_sweep_interval(),
            self.shutdown_rx.clone(),
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "verify-gateway listening");

        let app = build_router(self.state.clone());
        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("ctrl-c received, initiating shutdown");
                        let _ = shutdown_tx.send(true);
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("shutdown requested");
                        }
                    }
                }
            })
            .await?;

        // Stop the sweeper before reporting shutdown complete.
        let _ = self.shutdown_tx.send(true);
        let _ = sweeper.await;
        info!("gateway shutdown complete");
        Ok(())
    }

    /// Request the gateway to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Handle that can stop the gateway from another task.
    #[must_use]
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }
}
