//! Logbook HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server for the logbook API.
#[derive(Debug, Clone)]
pub struct LogbookServer {
    state: Arc<AppState>,
}

impl LogbookServer {
    /// Create a server over an in-memory logbook service.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_state(AppState::new(config))
    }

    /// Create a server around prepared state.
    #[must_use]
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Get the shared state for external access.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Start the server on the configured address.
    ///
    /// This method runs until the server encounters a fatal error.
    pub async fn serve(&self) -> ApiResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server, shutting down once `shutdown` completes.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ApiResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config().bind_addr;
        let listener = bind(addr).await?;

        let local = listener.local_addr().unwrap_or(addr);
        info!(addr = %local, "Logbook server listening");

        let router = create_router(self.state.clone());

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ApiError::Serve)?;

        info!("Logbook server shut down");
        Ok(())
    }
}

async fn bind(addr: SocketAddr) -> ApiResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::BindFailed(addr, e))
}
