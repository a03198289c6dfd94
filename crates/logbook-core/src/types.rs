//! Core entity types for the operations logbook.
//!
//! This module provides:
//! - [`LogEntry`]: Immutable log entry built through [`LogEntryBuilder`]
//! - [`Logbook`], [`Tag`], [`Property`]: Soft-deletable master records
//! - [`State`]: Active/Inactive lifecycle state
//! - [`SearchResult`]: Hit count plus the page of matching entries

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LogbookError, Result};

/// Level assigned to entries that do not name one.
pub const DEFAULT_LEVEL: &str = "Info";

/// Unique identifier for a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state shared by entries and master records.
///
/// Nothing is ever physically deleted; deletion flips the state to `Inactive`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Visible by default.
    #[default]
    Active,
    /// Soft-deleted.
    Inactive,
}

impl State {
    /// Returns true for [`State::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A named category used to group log entries.
///
/// Two logbooks are equal when both name and owner are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logbook {
    /// Unique, case-sensitive name.
    pub name: String,
    /// Owner of the logbook.
    #[serde(default)]
    pub owner: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: State,
}

/// A free-form label attachable to log entries.
///
/// Two tags are equal when their names are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Unique, case-sensitive name.
    pub name: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: State,
}

/// One key/value pair inside a [`Property`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    #[serde(default)]
    pub value: String,
    /// Lifecycle state.
    #[serde(default)]
    pub state: State,
}

/// A named bag of attributes attachable to log entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Unique name.
    pub name: String,
    /// Owner of the property definition.
    #[serde(default)]
    pub owner: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: State,
    /// Nested attributes, searchable as `name.attribute.value`.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A named instant embedded in a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// When the event happened.
    pub instant: DateTime<Utc>,
}

/// An immutable log entry.
///
/// Entries are only ever produced by [`LogEntryBuilder::build`] or
/// [`LogEntry::replaced_by`], both of which validate the payload once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    id: LogId,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    description: String,
    title: String,
    level: String,
    #[serde(default)]
    state: State,
    created_date: DateTime<Utc>,
    #[serde(default)]
    modify_date: Option<DateTime<Utc>>,
    #[serde(default)]
    events: Vec<Event>,
    logbooks: Vec<Logbook>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    properties: Vec<Property>,
}

/// Total hit count plus the requested page of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Number of entries matching the query, regardless of paging.
    pub hit_count: u64,
    /// The page of matching entries.
    pub logs: Vec<LogEntry>,
}

/// Common surface of soft-deletable master records.
pub trait MasterRecord: Clone + Send + Sync + 'static {
    /// Human readable kind, used in errors and logs.
    const KIND: &'static str;

    /// Unique key of the record.
    fn key(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> State;

    /// Overwrites the lifecycle state.
    fn set_state(&mut self, state: State);

    /// Checks the record before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::Validation`] if the record is malformed.
    fn validate(&self) -> Result<()> {
        if self.key().trim().is_empty() {
            return Err(LogbookError::Validation(format!(
                "{} name cannot be empty",
                Self::KIND
            )));
        }
        Ok(())
    }
}

impl Logbook {
    /// Creates an active logbook.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: Some(owner.into()),
            state: State::Active,
        }
    }
}

impl PartialEq for Logbook {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.owner == other.owner
    }
}

impl Eq for Logbook {}

impl MasterRecord for Logbook {
    const KIND: &'static str = "logbook";

    fn key(&self) -> &str {
        &self.name
    }

    fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
    }
}

impl Tag {
    /// Creates an active tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: State::Active,
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tag {}

impl MasterRecord for Tag {
    const KIND: &'static str = "tag";

    fn key(&self) -> &str {
        &self.name
    }

    fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
    }
}

impl Attribute {
    /// Creates an active attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            state: State::Active,
        }
    }
}

impl Property {
    /// Creates an active property without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: None,
            state: State::Active,
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

impl MasterRecord for Property {
    const KIND: &'static str = "property";

    fn key(&self) -> &str {
        &self.name
    }

    fn state(&self) -> State {
        self.state
    }

    fn set_state(&mut self, state: State) {
        self.state = state;
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LogbookError::Validation(
                "property name cannot be empty".to_string(),
            ));
        }
        if let Some(attribute) = self.attributes.iter().find(|a| a.name.trim().is_empty()) {
            return Err(LogbookError::Validation(format!(
                "attribute name cannot be empty in property {} (value {:?})",
                self.name, attribute.value
            )));
        }
        Ok(())
    }
}

impl Event {
    /// Creates an event.
    pub fn new(name: impl Into<String>, instant: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            instant,
        }
    }
}

impl LogEntry {
    /// Creates a new log entry builder.
    #[must_use]
    pub fn builder() -> LogEntryBuilder {
        LogEntryBuilder::default()
    }

    /// Identifier assigned at creation.
    #[must_use]
    pub const fn id(&self) -> LogId {
        self.id
    }

    /// Owner of the entry.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Free-form source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Description body.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Title, never empty.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Severity label.
    #[must_use]
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Creation instant.
    #[must_use]
    pub const fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    /// Instant of the last replacement, if any.
    #[must_use]
    pub const fn modify_date(&self) -> Option<DateTime<Utc>> {
        self.modify_date
    }

    /// Embedded events, in insertion order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Referenced logbooks, at least one.
    #[must_use]
    pub fn logbooks(&self) -> &[Logbook] {
        &self.logbooks
    }

    /// Referenced tags.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Attached properties.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Builds the replacement of this entry from an update payload.
    ///
    /// The id, creation date, state and events are carried over, as is the
    /// owner unless the update names one. Everything else comes from
    /// `update`, and the modify date is set to `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update payload fails validation.
    pub fn replaced_by(&self, update: LogEntryBuilder, now: DateTime<Utc>) -> Result<Self> {
        let owner = update.owner.clone().unwrap_or_else(|| self.owner.clone());
        let mut replacement = update
            .id(self.id)
            .created_date(self.created_date)
            .state(self.state)
            .owner(owner)
            .build()?;
        replacement.events.clone_from(&self.events);
        replacement.modify_date = Some(now);
        Ok(replacement)
    }
}

/// Builder for constructing log entries.
///
/// The builder doubles as the wire payload for create and replace requests,
/// so it deserializes from the same camelCase JSON as [`LogEntry`]. The
/// lifecycle state is never read from the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEntryBuilder {
    id: Option<LogId>,
    owner: Option<String>,
    source: Option<String>,
    description: Option<String>,
    title: Option<String>,
    level: Option<String>,
    #[serde(skip_deserializing)]
    state: Option<State>,
    created_date: Option<DateTime<Utc>>,
    events: Vec<Event>,
    logbooks: Vec<Logbook>,
    tags: Vec<Tag>,
    properties: Vec<Property>,
}

impl LogEntryBuilder {
    /// Sets the log ID.
    #[must_use]
    pub const fn id(mut self, id: LogId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the source.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the level.
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub const fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the creation instant.
    #[must_use]
    pub const fn created_date(mut self, created_date: DateTime<Utc>) -> Self {
        self.created_date = Some(created_date);
        self
    }

    /// Appends an event.
    #[must_use]
    pub fn event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Adds a logbook reference.
    #[must_use]
    pub fn logbook(mut self, logbook: Logbook) -> Self {
        self.logbooks.push(logbook);
        self
    }

    /// Adds a tag reference.
    #[must_use]
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Replaces every logbook reference.
    #[must_use]
    pub fn with_logbooks(mut self, logbooks: Vec<Logbook>) -> Self {
        self.logbooks = logbooks;
        self
    }

    /// Replaces every tag reference.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Names of the referenced logbooks.
    pub fn logbook_names(&self) -> impl Iterator<Item = &str> {
        self.logbooks.iter().map(|l| l.name.as_str())
    }

    /// Names of the referenced tags.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    /// The id set on the payload, if any.
    #[must_use]
    pub const fn requested_id(&self) -> Option<LogId> {
        self.id
    }

    /// Checks the payload invariants without consuming the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is missing or empty, or if no logbook
    /// is referenced.
    pub fn validate(&self) -> Result<()> {
        match self.title.as_deref() {
            None => return Err(LogbookError::MissingField("title")),
            Some(title) if title.trim().is_empty() => {
                return Err(LogbookError::Validation(
                    "a title must be specified".to_string(),
                ));
            }
            Some(_) => {}
        }
        if self.logbooks.is_empty() {
            return Err(LogbookError::Validation(
                "at least one logbook must be specified".to_string(),
            ));
        }
        if let Some(property) = self.properties.iter().find(|p| p.validate().is_err()) {
            return property.validate();
        }
        Ok(())
    }

    /// Builds the log entry, returning an error if required fields are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the id or creation date has not been assigned, or
    /// if [`LogEntryBuilder::validate`] fails.
    pub fn build(self) -> Result<LogEntry> {
        self.validate()?;
        let id = self.id.ok_or(LogbookError::MissingField("id"))?;
        let created_date = self
            .created_date
            .ok_or(LogbookError::MissingField("createdDate"))?;
        let title = self.title.ok_or(LogbookError::MissingField("title"))?;

        Ok(LogEntry {
            id,
            owner: self.owner.unwrap_or_default(),
            source: self.source.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            title,
            level: self
                .level
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string()),
            state: self.state.unwrap_or_default(),
            created_date,
            modify_date: None,
            events: self.events,
            logbooks: dedup(self.logbooks),
            tags: dedup(self.tags),
            properties: dedup(self.properties),
        })
    }
}

/// Drops later duplicates, keeping first-seen order.
fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
