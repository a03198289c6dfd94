//! Shared state for the logbook server.

use std::sync::Arc;
use std::time::Instant;

use logbook_core::{Backends, LogbookService};

use crate::config::ServerConfig;

/// Shared state handed to every request handler.
#[derive(Debug)]
pub struct AppState {
    config: Arc<ServerConfig>,
    service: Arc<LogbookService>,
    start_time: Instant,
}

impl AppState {
    /// Create state over an in-memory logbook service.
    pub fn new(config: ServerConfig) -> Self {
        let service = LogbookService::in_memory(config.service.clone());
        Self::with_service(config, Arc::new(service))
    }

    /// Create state over the given backends.
    pub fn with_backends(config: ServerConfig, backends: Backends) -> Self {
        let service = LogbookService::new(config.service.clone(), backends);
        Self::with_service(config, Arc::new(service))
    }

    /// Create state around an existing service.
    pub fn with_service(config: ServerConfig, service: Arc<LogbookService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
            start_time: Instant::now(),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the logbook service.
    pub fn service(&self) -> &LogbookService {
        &self.service
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
