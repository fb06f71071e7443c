//! imgrelay - image hosting relay
//!
//! Accepts base64 image uploads, stores them in a GitHub repository under a
//! random identifier, and serves them back with immutable caching headers.

pub mod api;
pub mod config;
pub mod images;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use store::{BlobStore, GitHubStore};

/// The relay server instance
pub struct Server {
    state: api::AppState,
    bind_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server backed by the configured GitHub repository
    pub fn new(config: Config) -> Result<Self> {
        let store = GitHubStore::new(&config.store)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Create a server backed by an arbitrary blob store
    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let bind_addr = config.bind_addr;

        Self {
            state: api::AppState::new(config, store),
            bind_addr,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            owner = %self.state.config.store.owner,
            repo = %self.state.config.store.repo,
            "imgrelay listening on {}",
            local_addr
        );

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_rx.changed().await.ok();
        })
        .await?;

        info!("imgrelay shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
