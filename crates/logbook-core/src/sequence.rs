//! Log entry id allocation.
//!
//! Ids come from the version the counter store assigns to each write of a
//! space's counter document. The generator keeps no lock or cache of its own;
//! the store serializes concurrent writers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, warn};

use crate::error::{LogbookError, Result};
use crate::traits::CounterStore;
use crate::types::LogId;

/// Allocates unique, strictly increasing log entry ids.
#[derive(Debug)]
pub struct SequenceGenerator<C: ?Sized> {
    store: Arc<C>,
    space: String,
}

impl<C: ?Sized> Clone for SequenceGenerator<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            space: self.space.clone(),
        }
    }
}

impl<C: CounterStore + ?Sized> SequenceGenerator<C> {
    /// Creates a generator allocating from `space` in `store`.
    pub fn new(store: Arc<C>, space: impl Into<String>) -> Self {
        Self {
            store,
            space: space.into(),
        }
    }

    /// The counter space ids are drawn from.
    #[must_use]
    pub fn space(&self) -> &str {
        &self.space
    }

    /// Allocates the next id.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::Allocation`] if the counter space is missing and
    /// [`LogbookError::TransientStore`] if the store is unreachable.
    pub fn next_id(&self) -> Result<LogId> {
        match self.store.index_counter(&self.space) {
            Ok(version) => Ok(LogId(version)),
            Err(e) if e.is_retryable() => {
                warn!(space = %self.space, error = %e, "counter store unavailable");
                Err(e)
            }
            Err(e) => {
                error!(space = %self.space, error = %e, "id allocation failed");
                Err(e)
            }
        }
    }
}

/// In-memory counter store: one version counter per space.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    versions: Mutex<HashMap<String, u64>>,
    offline: AtomicBool,
}

impl MemoryCounterStore {
    /// Creates an empty store with no spaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `space` already provisioned.
    #[must_use]
    pub fn with_space(space: &str) -> Self {
        let store = Self::new();
        store.create_space(space);
        store
    }

    /// Provisions `space`; an existing space keeps its version.
    pub fn create_space(&self, space: &str) {
        self.versions.lock().entry(space.to_string()).or_insert(0);
    }

    /// Simulates losing or regaining connectivity to the store.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The last version assigned in `space`, if the space exists.
    #[must_use]
    pub fn current_version(&self, space: &str) -> Option<u64> {
        self.versions.lock().get(space).copied()
    }
}

impl CounterStore for MemoryCounterStore {
    fn index_counter(&self, space: &str) -> Result<u64> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LogbookError::TransientStore(format!(
                "counter space {space} unreachable"
            )));
        }
        let mut versions = self.versions.lock();
        let version = versions
            .get_mut(space)
            .ok_or_else(|| LogbookError::Allocation(format!("counter space {space} does not exist")))?;
        *version = version
            .checked_add(1)
            .ok_or_else(|| LogbookError::Allocation(format!("counter space {space} exhausted")))?;
        Ok(*version)
    }
}
