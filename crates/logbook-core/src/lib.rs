//! # logbook-core
//!
//! Query resolution, matching and id allocation for an operations logbook.
//!
//! This crate provides:
//!
//! - [`LogEntry`] — Immutable log entries built via [`LogEntryBuilder`]
//! - [`Logbook`], [`Tag`], [`Property`] — Soft-deletable master records
//! - [`SearchQuery`] / [`ParsedQuery`] — Raw parameters and their typed clauses
//! - [`QueryComposer`] / [`QueryPlan`] — AND/OR composition with time windows
//! - [`TimeResolver`] / [`Zone`] — Absolute and relative (`"3 days 20 mins"`) time parsing
//! - [`SequenceGenerator`] — Unique, strictly increasing entry ids
//! - [`VisibilityFilter`] — Active/Inactive visibility with an override
//! - [`LogbookService`] — Validation, creation, replacement and search
//!
//! ## Example
//!
//! ```rust
//! use logbook_core::{LogEntry, Logbook, LogbookService, SearchQuery, ServiceConfig};
//!
//! let service = LogbookService::in_memory(ServiceConfig::default());
//! service
//!     .logbooks()
//!     .put("Operations", Logbook::new("Operations", "admin"))
//!     .unwrap();
//!
//! let entry = service
//!     .create_log(
//!         LogEntry::builder()
//!             .title("Beam dump")
//!             .description("check complete")
//!             .logbook(Logbook::new("Operations", "admin")),
//!     )
//!     .unwrap();
//!
//! let result = service
//!     .search(&SearchQuery::new().with("desc", "complete"))
//!     .unwrap();
//! assert_eq!(result.hit_count, 1);
//! assert_eq!(result.logs[0].id(), entry.id());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod index;
pub mod matcher;
pub mod plan;
pub mod query;
pub mod sequence;
pub mod service;
pub mod store;
pub mod time;
pub mod traits;
pub mod types;
pub mod visibility;

// Re-export main types
pub use config::ServiceConfig;
pub use error::{LogbookError, Result};
pub use index::MemoryIndex;
pub use matcher::{CaseMode, TextTerm};
pub use plan::{Clause, QueryComposer, QueryPlan, TimeWindow};
pub use query::{ParsedQuery, PropertyPath, SearchQuery, SortOrder, validate_raw_query};
pub use sequence::{MemoryCounterStore, SequenceGenerator};
pub use service::{Backends, LogbookService, MasterCatalog};
pub use store::MemoryMasterStore;
pub use time::{Period, TemporalAmount, TimeResolver, TimeValue, Zone};
pub use traits::{CounterStore, LogRepository, MasterRepository, SearchBackend};
pub use types::{
    Attribute, Event, LogEntry, LogEntryBuilder, LogId, Logbook, MasterRecord, Property,
    SearchResult, State, Tag,
};
pub use visibility::VisibilityFilter;
