//! Active/Inactive visibility.

use crate::types::{MasterRecord, State};

/// Decides which records a read may return.
///
/// By default only [`State::Active`] records are visible; the `inactive=true`
/// override makes soft-deleted records visible as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityFilter {
    include_inactive: bool,
}

impl VisibilityFilter {
    /// Only active records.
    pub const ACTIVE_ONLY: Self = Self {
        include_inactive: false,
    };

    /// Active and inactive records.
    pub const ALL: Self = Self {
        include_inactive: true,
    };

    /// Creates a filter from the `inactive` override.
    #[must_use]
    pub const fn new(include_inactive: bool) -> Self {
        Self { include_inactive }
    }

    /// Returns true if inactive records are visible.
    #[must_use]
    pub const fn includes_inactive(&self) -> bool {
        self.include_inactive
    }

    /// Returns true if a record in `state` is visible.
    #[must_use]
    pub const fn admits(&self, state: State) -> bool {
        self.include_inactive || state.is_active()
    }

    /// Keeps only the visible master records.
    #[must_use]
    pub fn apply<T: MasterRecord>(&self, records: Vec<T>) -> Vec<T> {
        records
            .into_iter()
            .filter(|r| self.admits(r.state()))
            .collect()
    }
}
