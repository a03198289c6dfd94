//! In-memory log entry index.
//!
//! This module provides:
//! - [`MemoryIndex`]: Entries keyed by id, executing [`QueryPlan`]s by scan
//!
//! The index stands in for the external full-text engine: it evaluates every
//! clause of a plan against each stored entry, counts the hits, then sorts and
//! pages them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{LogbookError, Result};
use crate::plan::QueryPlan;
use crate::query::SortOrder;
use crate::traits::{LogRepository, SearchBackend};
use crate::types::{LogEntry, LogId, SearchResult};

/// In-memory index of log entries.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<BTreeMap<LogId, LogEntry>>,
    offline: AtomicBool,
}

impl MemoryIndex {
    /// Creates a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing or regaining connectivity to the index.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LogbookError::TransientStore("log index unreachable".to_string()));
        }
        Ok(())
    }
}

impl LogRepository for MemoryIndex {
    fn get(&self, id: LogId) -> Result<Option<LogEntry>> {
        self.ensure_online()?;
        Ok(self.entries.read().get(&id).cloned())
    }

    fn save(&self, entry: LogEntry) -> Result<LogEntry> {
        self.ensure_online()?;
        self.entries.write().insert(entry.id(), entry.clone());
        Ok(entry)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl SearchBackend for MemoryIndex {
    fn search(&self, plan: &QueryPlan) -> Result<SearchResult> {
        self.ensure_online()?;

        let mut hits: Vec<LogEntry> = self
            .entries
            .read()
            .values()
            .filter(|entry| plan.matches(entry))
            .cloned()
            .collect();

        hits.sort_by_key(|entry| (entry.created_date(), entry.id()));
        if plan.sort == SortOrder::Descending {
            hits.reverse();
        }

        let hit_count = hits.len() as u64;
        let logs: Vec<LogEntry> = hits.into_iter().skip(plan.from).take(plan.size).collect();
        debug!(hit_count, returned = logs.len(), "executed query plan");

        Ok(SearchResult { hit_count, logs })
    }
}
