//! In-memory master record storage.
//!
//! One [`MemoryMasterStore`] instance per record kind backs the logbook, tag
//! and property repositories.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{LogbookError, Result};
use crate::traits::MasterRepository;
use crate::types::{MasterRecord, State};
use crate::visibility::VisibilityFilter;

/// In-memory store of soft-deletable master records keyed by name.
#[derive(Debug)]
pub struct MemoryMasterStore<T> {
    records: RwLock<BTreeMap<String, T>>,
}

impl<T> Default for MemoryMasterStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T: MasterRecord> MemoryMasterStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                map.insert(record.key().to_string(), record);
            }
        }
        store
    }

    /// Number of records, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl<T: MasterRecord> MasterRepository<T> for MemoryMasterStore<T> {
    fn get(&self, key: &str) -> Result<Option<T>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn list(&self, visibility: VisibilityFilter) -> Result<Vec<T>> {
        Ok(visibility.apply(self.records.read().values().cloned().collect()))
    }

    fn save(&self, record: T) -> Result<T> {
        self.records
            .write()
            .insert(record.key().to_string(), record.clone());
        Ok(record)
    }

    fn deactivate(&self, key: &str) -> Result<T> {
        let mut records = self.records.write();
        let record = records
            .get_mut(key)
            .ok_or_else(|| LogbookError::not_found(T::KIND, key))?;
        record.set_state(State::Inactive);
        Ok(record.clone())
    }
}
