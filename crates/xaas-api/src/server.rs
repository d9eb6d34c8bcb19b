//! API server implementation

use std::future::Future;

use tokio::net::TcpListener;
use xaas_core::Settings;
use xaas_storage::SqliteStore;

use crate::{AppState, Result, build_router};

/// xaas-admin HTTP server
pub struct Server {
    state: AppState,
}

impl Server {
    /// Open the database, create missing tables and register every model.
    pub async fn new(settings: Settings) -> Result<Self> {
        let store = SqliteStore::connect(&settings.database).await?;
        store.migrate().await?;
        Ok(Self {
            state: AppState::new(store, settings)?,
        })
    }

    /// Server around an already opened store.
    pub fn with_store(store: SqliteStore, settings: Settings) -> Result<Self> {
        Ok(Self {
            state: AppState::new(store, settings)?,
        })
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves, then close the pool.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.state.settings.bind_address();
        let listener = TcpListener::bind(&address).await?;
        tracing::info!(
            address = %listener.local_addr()?,
            server = %self.state.settings.server_name,
            "Listening"
        );

        let store = self.state.store.clone();
        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        store.close().await;
        tracing::info!("Server stopped");
        Ok(())
    }
}
