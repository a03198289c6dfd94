//! Query composition.
//!
//! A [`QueryPlan`] is the AND of its [`Clause`]s; each clause is the OR of
//! its alternatives. The plan also carries the time window, the visibility
//! predicate and the paging/sort settings the index applies afterwards.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{LogbookError, Result};
use crate::matcher::{self, CaseMode, TextTerm};
use crate::query::{ParsedQuery, PropertyPath, SearchQuery, SortOrder};
use crate::time::TimeResolver;
use crate::types::{LogEntry, Property};
use crate::visibility::VisibilityFilter;

/// An inclusive window over entry creation (and optionally event) instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest admitted instant.
    pub start: Option<DateTime<Utc>>,
    /// Latest admitted instant.
    pub end: Option<DateTime<Utc>>,
    /// Also admit entries with an event inside the window.
    pub include_events: bool,
}

impl TimeWindow {
    /// Returns true if the window cannot contain any instant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }

    /// Returns true if `instant` lies inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| instant >= start) && self.end.is_none_or(|end| instant <= end)
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        self.contains(entry.created_date())
            || (self.include_events && entry.events().iter().any(|e| self.contains(e.instant)))
    }
}

/// One AND-ed constraint of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Description terms.
    Description {
        /// Alternatives.
        terms: Vec<TextTerm>,
        /// Fuzzy word matching.
        fuzzy: bool,
    },
    /// Title terms.
    Title {
        /// Alternatives.
        terms: Vec<TextTerm>,
        /// Fuzzy word matching.
        fuzzy: bool,
    },
    /// Description phrases from the `phrase` parameter.
    Phrase(Vec<String>),
    /// Owner patterns.
    Owner(Vec<String>),
    /// Level patterns.
    Level {
        /// Alternatives.
        patterns: Vec<String>,
        /// Fuzzy whole-value matching.
        fuzzy: bool,
    },
    /// Logbook name patterns.
    Logbooks(Vec<String>),
    /// Tag name patterns.
    Tags(Vec<String>),
    /// Property paths.
    Properties(Vec<PropertyPath>),
    /// Creation/event time window.
    Time(TimeWindow),
}

impl Clause {
    /// Returns true if `entry` satisfies at least one alternative.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            Self::Description { terms, fuzzy } => {
                let tokens = matcher::tokenize(entry.description());
                terms.iter().any(|t| t.matches(&tokens, *fuzzy))
            }
            Self::Title { terms, fuzzy } => {
                let tokens = matcher::tokenize(entry.title());
                terms.iter().any(|t| t.matches(&tokens, *fuzzy))
            }
            Self::Phrase(phrases) => {
                let tokens = matcher::tokenize(entry.description());
                phrases.iter().any(|p| matcher::phrase_matches(p, &tokens))
            }
            Self::Owner(patterns) => patterns
                .iter()
                .any(|p| matcher::keyword_matches(p, entry.owner(), CaseMode::Insensitive)),
            Self::Level { patterns, fuzzy } => patterns.iter().any(|p| {
                if *fuzzy {
                    matcher::fuzzy_matches(p, entry.level())
                } else {
                    matcher::keyword_matches(p, entry.level(), CaseMode::Insensitive)
                }
            }),
            Self::Logbooks(patterns) => patterns.iter().any(|p| {
                entry
                    .logbooks()
                    .iter()
                    .any(|l| matcher::keyword_matches(p, &l.name, CaseMode::Sensitive))
            }),
            Self::Tags(patterns) => patterns.iter().any(|p| {
                entry
                    .tags()
                    .iter()
                    .any(|t| matcher::keyword_matches(p, &t.name, CaseMode::Sensitive))
            }),
            Self::Properties(paths) => paths
                .iter()
                .any(|path| entry.properties().iter().any(|p| property_matches(path, p))),
            Self::Time(window) => window.matches(entry),
        }
    }
}

fn property_matches(path: &PropertyPath, property: &Property) -> bool {
    let like = |pattern: Option<&str>, value: &str| {
        pattern.is_none_or(|p| matcher::keyword_matches(p, value, CaseMode::Insensitive))
    };
    if !like(path.name.as_deref(), &property.name) {
        return false;
    }
    if path.attribute.is_none() && path.value.is_none() {
        return true;
    }
    property
        .attributes
        .iter()
        .any(|a| like(path.attribute.as_deref(), &a.name) && like(path.value.as_deref(), &a.value))
}

/// A fully resolved search, ready for an index to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// AND-ed clauses.
    pub clauses: Vec<Clause>,
    /// Which entry states are returned.
    pub visibility: VisibilityFilter,
    /// Number of matching entries to skip.
    pub from: usize,
    /// Maximum number of entries to return.
    pub size: usize,
    /// Ordering by creation date.
    pub sort: SortOrder,
}

impl Default for QueryPlan {
    fn default() -> Self {
        Self {
            clauses: Vec::new(),
            visibility: VisibilityFilter::default(),
            from: 0,
            size: crate::config::DEFAULT_PAGE_SIZE,
            sort: SortOrder::default(),
        }
    }
}

impl QueryPlan {
    /// Returns true if `entry` is visible and satisfies every clause.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.visibility.admits(entry.state()) && self.clauses.iter().all(|c| c.matches(entry))
    }
}

/// Builds [`QueryPlan`]s from parsed parameters.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    resolver: TimeResolver,
    config: ServiceConfig,
}

impl QueryComposer {
    /// Creates a composer with the given configuration.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            resolver: TimeResolver::new(config.time_zone),
            config,
        }
    }

    /// Parses and composes raw search parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are malformed.
    pub fn compose_query(&self, query: &SearchQuery, now: DateTime<Utc>) -> Result<QueryPlan> {
        self.compose(ParsedQuery::parse(query)?, now)
    }

    /// Composes parsed clauses into a plan; relative times count back from `now`.
    ///
    /// Absolute times are read in the query's `tz` zone when it names one,
    /// otherwise in the configured zone.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::MalformedQuery`] if the resolved start lies
    /// after the resolved end.
    pub fn compose(&self, parsed: ParsedQuery, now: DateTime<Utc>) -> Result<QueryPlan> {
        let resolver = parsed.time_zone.map_or(self.resolver, TimeResolver::new);
        let fuzzy = parsed.fuzzy;
        let mut clauses = Vec::new();

        if let Some(terms) = parsed.description {
            clauses.push(Clause::Description { terms, fuzzy });
        }
        if let Some(terms) = parsed.title {
            clauses.push(Clause::Title { terms, fuzzy });
        }
        if let Some(phrases) = parsed.phrase {
            clauses.push(Clause::Phrase(phrases));
        }
        if let Some(patterns) = parsed.owner {
            clauses.push(Clause::Owner(patterns));
        }
        if let Some(patterns) = parsed.level {
            clauses.push(Clause::Level { patterns, fuzzy });
        }
        if let Some(patterns) = parsed.logbooks {
            clauses.push(Clause::Logbooks(patterns));
        }
        if let Some(patterns) = parsed.tags {
            clauses.push(Clause::Tags(patterns));
        }
        if !parsed.properties.is_empty() {
            clauses.push(Clause::Properties(parsed.properties));
        }

        let window = TimeWindow {
            start: resolve_bound(resolver, "start", &parsed.start, now, Iterator::min),
            end: resolve_bound(resolver, "end", &parsed.end, now, Iterator::max),
            include_events: parsed.include_events,
        };
        if window.is_empty() {
            return Err(LogbookError::MalformedQuery(format!(
                "invalid start and end times: {start:?} is after {end:?}",
                start = parsed.start,
                end = parsed.end,
            )));
        }
        if window.start.is_some() || window.end.is_some() {
            clauses.push(Clause::Time(window));
        }

        let plan = QueryPlan {
            clauses,
            visibility: VisibilityFilter::new(parsed.include_inactive),
            from: parsed.from.unwrap_or(0),
            size: self.config.page_size(parsed.size),
            sort: parsed.sort.unwrap_or_default(),
        };
        debug!(
            clauses = plan.clauses.len(),
            from = plan.from,
            size = plan.size,
            sort = ?plan.sort,
            include_inactive = plan.visibility.includes_inactive(),
            "composed query plan"
        );
        Ok(plan)
    }
}

fn resolve_bound<F>(
    resolver: TimeResolver,
    name: &str,
    values: &[String],
    now: DateTime<Utc>,
    pick: F,
) -> Option<DateTime<Utc>>
where
    F: FnOnce(std::vec::IntoIter<DateTime<Utc>>) -> Option<DateTime<Utc>>,
{
    let resolved: Vec<DateTime<Utc>> = values
        .iter()
        .filter_map(|value| match resolver.resolve(value, now) {
            Ok(instant) => Some(instant),
            Err(e) => {
                warn!(parameter = name, value = %value, error = %e, "ignoring unparsable time bound");
                None
            }
        })
        .collect();
    pick(resolved.into_iter())
}
