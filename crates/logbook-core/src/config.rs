//! Logbook service configuration.

use crate::time::Zone;

/// Default number of entries per search page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Upper bound on the number of entries per search page.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Counter space used for log entry ids.
pub const DEFAULT_SEQUENCE_SPACE: &str = "logbook_sequence";

/// Configuration for the logbook service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Page size when a search does not give `size`/`limit`.
    pub default_page_size: usize,
    /// Largest page size a search may request.
    pub max_page_size: usize,
    /// Counter space the sequence generator allocates from.
    pub sequence_space: String,
    /// Zone for absolute timestamps without an explicit offset, unless a
    /// search names its own with `tz`.
    pub time_zone: Zone,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            sequence_space: DEFAULT_SEQUENCE_SPACE.to_string(),
            time_zone: Zone::UTC,
        }
    }
}

impl ServiceConfig {
    /// Set the default page size.
    #[must_use]
    pub const fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the maximum page size.
    #[must_use]
    pub const fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    /// Set the sequence counter space.
    #[must_use]
    pub fn with_sequence_space(mut self, space: impl Into<String>) -> Self {
        self.sequence_space = space.into();
        self
    }

    /// Set the time zone for absolute timestamps.
    #[must_use]
    pub const fn with_time_zone(mut self, zone: Zone) -> Self {
        self.time_zone = zone;
        self
    }

    /// Clamps a requested page size to the configured maximum.
    #[must_use]
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}
