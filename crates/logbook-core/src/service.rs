//! The logbook service.
//!
//! [`LogbookService`] ties the parser, composer, sequence generator and
//! persistence ports together. Every operation returns a fully resolved value
//! or a typed error; the service holds no mutable state of its own.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{LogbookError, Result};
use crate::index::MemoryIndex;
use crate::plan::{QueryComposer, QueryPlan};
use crate::query::SearchQuery;
use crate::sequence::{MemoryCounterStore, SequenceGenerator};
use crate::store::MemoryMasterStore;
use crate::traits::{CounterStore, LogRepository, MasterRepository, SearchBackend};
use crate::types::{
    LogEntry, LogEntryBuilder, LogId, Logbook, MasterRecord, Property, SearchResult, State, Tag,
};
use crate::visibility::VisibilityFilter;

/// The collaborators a [`LogbookService`] is built on.
#[derive(Clone)]
pub struct Backends {
    /// Log entry storage.
    pub logs: Arc<dyn LogRepository>,
    /// Plan executor over the stored entries.
    pub search: Arc<dyn SearchBackend>,
    /// Logbook storage.
    pub logbooks: Arc<dyn MasterRepository<Logbook>>,
    /// Tag storage.
    pub tags: Arc<dyn MasterRepository<Tag>>,
    /// Property storage.
    pub properties: Arc<dyn MasterRepository<Property>>,
    /// Counter documents for id allocation.
    pub counters: Arc<dyn CounterStore>,
}

impl Backends {
    /// In-memory collaborators with `sequence_space` provisioned.
    #[must_use]
    pub fn in_memory(sequence_space: &str) -> Self {
        let index = Arc::new(MemoryIndex::new());
        Self {
            logs: Arc::clone(&index) as Arc<dyn LogRepository>,
            search: index,
            logbooks: Arc::new(MemoryMasterStore::<Logbook>::new()),
            tags: Arc::new(MemoryMasterStore::<Tag>::new()),
            properties: Arc::new(MemoryMasterStore::<Property>::new()),
            counters: Arc::new(MemoryCounterStore::with_space(sequence_space)),
        }
    }
}

/// Validated access to one kind of master record.
pub struct MasterCatalog<T: MasterRecord> {
    repo: Arc<dyn MasterRepository<T>>,
}

impl<T: MasterRecord> MasterCatalog<T> {
    /// Wraps a repository.
    pub fn new(repo: Arc<dyn MasterRepository<T>>) -> Self {
        Self { repo }
    }

    /// Lists the records admitted by `visibility`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub fn list(&self, visibility: VisibilityFilter) -> Result<Vec<T>> {
        self.repo.list(visibility)
    }

    /// Gets a record by key, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::NotFound`] if no record has that key.
    pub fn get(&self, key: &str) -> Result<T> {
        self.repo
            .get(key)?
            .ok_or_else(|| LogbookError::not_found(T::KIND, key))
    }

    /// Creates or replaces the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::Validation`] if the payload names a different
    /// key or fails the record's own validation.
    pub fn put(&self, key: &str, record: T) -> Result<T> {
        if record.key() != key {
            return Err(LogbookError::Validation(format!(
                "{} name {:?} does not match path {key:?}",
                T::KIND,
                record.key()
            )));
        }
        record.validate()?;
        let saved = self.repo.save(record)?;
        info!(kind = T::KIND, name = key, "saved master record");
        Ok(saved)
    }

    /// Soft-deletes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::NotFound`] if no record has that key.
    pub fn deactivate(&self, key: &str) -> Result<T> {
        let record = self.repo.deactivate(key)?;
        info!(kind = T::KIND, name = key, "deactivated master record");
        Ok(record)
    }

    /// Resolves `key` to an active record for use in a new entry.
    fn require_active(&self, key: &str) -> Result<T> {
        match self.repo.get(key)? {
            Some(record) if record.state().is_active() => Ok(record),
            Some(_) => Err(LogbookError::Validation(format!(
                "{} {key} is inactive",
                T::KIND
            ))),
            None => Err(LogbookError::Validation(format!(
                "{} {key} does not exist",
                T::KIND
            ))),
        }
    }
}

/// Log entry creation, replacement and search, plus master record management.
pub struct LogbookService {
    config: ServiceConfig,
    composer: QueryComposer,
    sequence: SequenceGenerator<dyn CounterStore>,
    logs: Arc<dyn LogRepository>,
    search: Arc<dyn SearchBackend>,
    logbooks: MasterCatalog<Logbook>,
    tags: MasterCatalog<Tag>,
    properties: MasterCatalog<Property>,
}

impl std::fmt::Debug for LogbookService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogbookService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LogbookService {
    /// Creates a service over the given collaborators.
    #[must_use]
    pub fn new(config: ServiceConfig, backends: Backends) -> Self {
        Self {
            composer: QueryComposer::new(config.clone()),
            sequence: SequenceGenerator::new(backends.counters, config.sequence_space.clone()),
            logs: backends.logs,
            search: backends.search,
            logbooks: MasterCatalog::new(backends.logbooks),
            tags: MasterCatalog::new(backends.tags),
            properties: MasterCatalog::new(backends.properties),
            config,
        }
    }

    /// Creates a service backed entirely by in-memory collaborators.
    #[must_use]
    pub fn in_memory(config: ServiceConfig) -> Self {
        let backends = Backends::in_memory(&config.sequence_space);
        Self::new(config, backends)
    }

    /// The service configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Logbook records.
    #[must_use]
    pub const fn logbooks(&self) -> &MasterCatalog<Logbook> {
        &self.logbooks
    }

    /// Tag records.
    #[must_use]
    pub const fn tags(&self) -> &MasterCatalog<Tag> {
        &self.tags
    }

    /// Property records.
    #[must_use]
    pub const fn properties(&self) -> &MasterCatalog<Property> {
        &self.properties
    }

    /// Validates and stores a new entry, assigning its id and creation date.
    ///
    /// Every referenced logbook and tag must exist and be active; the stored
    /// entry carries the current master records rather than the payload's
    /// copies.
    /// New entries are always active.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad payload, and propagates id
    /// allocation and store failures.
    pub fn create_log(&self, draft: LogEntryBuilder) -> Result<LogEntry> {
        draft.validate()?;
        let draft = self.resolve_references(draft)?;

        let id = self.sequence.next_id()?;
        let entry = draft
            .id(id)
            .state(State::Active)
            .created_date(Utc::now())
            .build()?;
        let entry = self.logs.save(entry)?;

        info!(
            id = %entry.id(),
            owner = entry.owner(),
            logbooks = entry.logbooks().len(),
            "created log entry"
        );
        Ok(entry)
    }

    /// Replaces the stored entry `id` with `update`.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::Validation`] if the payload id does not match
    /// `id` or the payload is invalid, and [`LogbookError::NotFound`] if no
    /// entry has that id.
    pub fn replace_log(&self, id: LogId, update: LogEntryBuilder) -> Result<LogEntry> {
        if update.requested_id() != Some(id) {
            return Err(LogbookError::Validation(format!(
                "log entry id does not match path id {id}"
            )));
        }
        let existing = self.get_log(id)?;
        update.validate()?;
        let update = self.resolve_references(update)?;

        let entry = self.logs.save(existing.replaced_by(update, Utc::now())?)?;
        info!(id = %entry.id(), "replaced log entry");
        Ok(entry)
    }

    /// Gets an entry by id, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::NotFound`] if no entry has that id.
    pub fn get_log(&self, id: LogId) -> Result<LogEntry> {
        self.logs
            .get(id)?
            .ok_or_else(|| LogbookError::not_found("log entry", id.to_string()))
    }

    /// Composes the search plan for `query` relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::MalformedQuery`] for structurally invalid
    /// parameters.
    pub fn plan(&self, query: &SearchQuery) -> Result<QueryPlan> {
        self.composer.compose_query(query, Utc::now())
    }

    /// Searches entries, returning the hit count and the requested page.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::MalformedQuery`] for structurally invalid
    /// parameters and propagates index failures.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult> {
        let plan = self.plan(query)?;
        let result = self.search.search(&plan)?;
        debug!(hit_count = result.hit_count, "search complete");
        Ok(result)
    }

    fn resolve_references(&self, draft: LogEntryBuilder) -> Result<LogEntryBuilder> {
        let logbooks = draft
            .logbook_names()
            .map(|name| self.logbooks.require_active(name))
            .collect::<Result<Vec<_>>>()?;
        let tags = draft
            .tag_names()
            .map(|name| self.tags.require_active(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(draft.with_logbooks(logbooks).with_tags(tags))
    }
}
