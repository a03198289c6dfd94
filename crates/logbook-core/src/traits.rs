//! Persistence ports.
//!
//! Each entity type has exactly one port. [`LogRepository`] and
//! [`SearchBackend`] cover log entries, [`MasterRepository`] is instantiated
//! for logbooks, tags and properties, and [`CounterStore`] backs the sequence
//! generator. The in-memory implementations live in [`crate::store`] and
//! [`crate::sequence`].

use crate::error::Result;
use crate::plan::QueryPlan;
use crate::types::{LogEntry, LogId, MasterRecord, SearchResult};
use crate::visibility::VisibilityFilter;

/// Storage for log entries.
pub trait LogRepository: Send + Sync {
    /// Gets an entry by id, regardless of its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn get(&self, id: LogId) -> Result<Option<LogEntry>>;

    /// Inserts or replaces the entry stored under its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot accept the entry.
    fn save(&self, entry: LogEntry) -> Result<LogEntry>;

    /// Returns the number of stored entries.
    fn len(&self) -> usize;

    /// Returns true if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes composed query plans.
pub trait SearchBackend: Send + Sync {
    /// Runs `plan`, returning the total hit count and the requested page.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LogbookError::TransientStore`] if the index is
    /// unreachable.
    fn search(&self, plan: &QueryPlan) -> Result<SearchResult>;
}

/// Storage for one kind of soft-deletable master record.
pub trait MasterRepository<T: MasterRecord>: Send + Sync {
    /// Gets a record by key, regardless of its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn get(&self, key: &str) -> Result<Option<T>>;

    /// Lists the records admitted by `visibility`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn list(&self, visibility: VisibilityFilter) -> Result<Vec<T>>;

    /// Creates or replaces the record stored under its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot accept the record.
    fn save(&self, record: T) -> Result<T>;

    /// Marks the record inactive and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LogbookError::NotFound`] if no record has that key.
    fn deactivate(&self, key: &str) -> Result<T>;
}

/// A store holding one versioned counter document per identifier space.
pub trait CounterStore: Send + Sync {
    /// Writes the counter document of `space` and returns the version the
    /// store assigned to the write.
    ///
    /// Versions returned for one space are strictly increasing, even under
    /// concurrent callers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LogbookError::Allocation`] if the space does not exist
    /// and [`crate::LogbookError::TransientStore`] if the store is unreachable.
    fn index_counter(&self, space: &str) -> Result<u64>;
}
