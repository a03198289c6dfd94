//! Search parameter parsing.
//!
//! This module provides:
//! - [`SearchQuery`]: Unordered multimap of raw parameter names to values
//! - [`ParsedQuery`]: The parameters classified into typed clauses
//! - [`PropertyPath`]: A `name.attribute.value` property filter
//! - [`validate_raw_query`]: Transport-level check of an undecoded query string

use tracing::{trace, warn};

use crate::error::{LogbookError, Result};
use crate::matcher::TextTerm;
use crate::time::Zone;

const TEXT_SEPARATORS: [char; 3] = ['|', ',', ';'];

/// Raw search parameters: names are case-sensitive, each may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    params: Vec<(String, String)>,
}

impl SearchQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query from decoded name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Adds one value for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Adds a presence-only flag such as `fuzzy`.
    #[must_use]
    pub fn with_flag(self, name: impl Into<String>) -> Self {
        self.with(name, "")
    }

    /// All values given for `name`, in arrival order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if `name` was given at least once.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|(k, _)| k == name)
    }

    /// Returns true if no parameters were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over every name/value pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Rejects an undecoded query string that a well-behaved client could not send.
///
/// Whitespace, control characters, non-ASCII bytes and broken percent escapes
/// make the whole request malformed; multi-word values must be encoded.
///
/// # Errors
///
/// Returns [`LogbookError::MalformedQuery`] naming the offending position.
pub fn validate_raw_query(raw: &str) -> Result<()> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() || b.is_ascii_control() || !b.is_ascii() {
            return Err(LogbookError::MalformedQuery(format!(
                "unescaped character at position {i}"
            )));
        }
        if b == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(LogbookError::MalformedQuery(format!(
                    "invalid percent escape at position {i}"
                )));
            }
            i += 3;
            continue;
        }
        i += 1;
    }
    Ok(())
}

/// Result ordering by creation date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    #[default]
    Descending,
}

impl SortOrder {
    /// Reads `asc`/`up` or `desc`/`down`, by prefix and ignoring case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_uppercase();
        if value.starts_with("ASC") || value.starts_with("UP") {
            Some(Self::Ascending)
        } else if value.starts_with("DESC") || value.starts_with("DOWN") {
            Some(Self::Descending)
        } else {
            None
        }
    }
}

/// A property filter; `None` segments match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyPath {
    /// Property name pattern.
    pub name: Option<String>,
    /// Attribute name pattern.
    pub attribute: Option<String>,
    /// Attribute value pattern, only meaningful with an attribute.
    pub value: Option<String>,
}

impl PropertyPath {
    /// Parses `name[.attribute[.value]]`; the value keeps any further dots.
    ///
    /// Returns `None` if every segment is empty.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.splitn(3, '.').map(segment);
        let parsed = Self {
            name: segments.next().flatten(),
            attribute: segments.next().flatten(),
            value: segments.next().flatten(),
        };
        (!parsed.is_unconstrained()).then_some(parsed)
    }

    /// Builds the filter for a `properties.<attribute>=<value>` parameter.
    #[must_use]
    pub fn for_attribute(attribute: &str, value: &str) -> Option<Self> {
        let attribute = segment(attribute)?;
        Some(Self {
            name: None,
            attribute: Some(attribute),
            value: segment(value),
        })
    }

    /// Returns true if no segment constrains the match.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.name.is_none() && self.attribute.is_none() && self.value.is_none()
    }
}

fn segment(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Search parameters classified into typed clauses.
///
/// `None` means the parameter was absent (no constraint); `Some` with an
/// empty list means it was present without usable terms (matches nothing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    /// `desc` / `description` / `text` terms.
    pub description: Option<Vec<TextTerm>>,
    /// `title` terms.
    pub title: Option<Vec<TextTerm>>,
    /// `phrase` values, matched against the description.
    pub phrase: Option<Vec<String>>,
    /// `owner` patterns.
    pub owner: Option<Vec<String>>,
    /// `level` patterns.
    pub level: Option<Vec<String>>,
    /// `logbooks` name patterns.
    pub logbooks: Option<Vec<String>>,
    /// `tags` name patterns.
    pub tags: Option<Vec<String>>,
    /// Property filters; empty means unconstrained.
    pub properties: Vec<PropertyPath>,
    /// `fuzzy` flag.
    pub fuzzy: bool,
    /// Raw `start` values.
    pub start: Vec<String>,
    /// Raw `end` values.
    pub end: Vec<String>,
    /// `includeevent` / `includeevents` flag.
    pub include_events: bool,
    /// `inactive` override.
    pub include_inactive: bool,
    /// `from` offset.
    pub from: Option<usize>,
    /// `size` / `limit` page size.
    pub size: Option<usize>,
    /// `sort` order.
    pub sort: Option<SortOrder>,
    /// `tz` zone for absolute `start`/`end` values.
    pub time_zone: Option<Zone>,
}

impl ParsedQuery {
    /// Classifies every recognized parameter of `query`.
    ///
    /// Unrecognized names are ignored. Unparsable paging and sort values are
    /// dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::MalformedQuery`] if a description or title
    /// value has unbalanced double quotes, or `tz` names an unknown zone.
    pub fn parse(query: &SearchQuery) -> Result<Self> {
        let mut parsed = Self::default();

        for (name, value) in query.iter() {
            match name {
                "desc" | "description" | "text" => {
                    extend(&mut parsed.description, split_text_terms(value)?);
                }
                "title" => extend(&mut parsed.title, split_text_terms(value)?),
                "phrase" => extend(&mut parsed.phrase, segment(value)),
                "owner" => extend(&mut parsed.owner, split_words(value)),
                "level" => extend(&mut parsed.level, split_words(value)),
                "logbooks" => extend(&mut parsed.logbooks, split_names(value)),
                "tags" => extend(&mut parsed.tags, split_names(value)),
                "properties" => parsed
                    .properties
                    .extend(split_names(value).iter().filter_map(|p| PropertyPath::parse(p))),
                "fuzzy" => parsed.fuzzy = true,
                "start" => parsed.start.push(value.to_string()),
                "end" => parsed.end.push(value.to_string()),
                "includeevent" | "includeevents" => parsed.include_events = true,
                "inactive" => {
                    parsed.include_inactive =
                        value.trim().is_empty() || value.trim().eq_ignore_ascii_case("true");
                }
                "tz" => {
                    if parsed.time_zone.is_none() && !value.trim().is_empty() {
                        parsed.time_zone = Some(Zone::parse(value)?);
                    }
                }
                "from" => parsed.from = max_number(parsed.from, name, value),
                "size" | "limit" => parsed.size = max_number(parsed.size, name, value),
                "sort" => {
                    if parsed.sort.is_none() {
                        parsed.sort = SortOrder::parse(value);
                        if parsed.sort.is_none() {
                            warn!(parameter = name, value, "ignoring unknown sort order");
                        }
                    }
                }
                _ => match name.strip_prefix("properties.") {
                    Some(attribute) => parsed
                        .properties
                        .extend(PropertyPath::for_attribute(attribute, value)),
                    None => trace!(parameter = name, "ignoring unrecognized search parameter"),
                },
            }
        }

        Ok(parsed)
    }
}

fn extend<T>(clause: &mut Option<Vec<T>>, terms: impl IntoIterator<Item = T>) {
    clause.get_or_insert_with(Vec::new).extend(terms);
}

fn max_number(current: Option<usize>, name: &str, value: &str) -> Option<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) => Some(current.map_or(n, |c| c.max(n))),
        Err(_) => {
            warn!(parameter = name, value, "ignoring unparsable number");
            current
        }
    }
}

fn is_text_separator(c: char) -> bool {
    TEXT_SEPARATORS.contains(&c) || c.is_whitespace()
}

/// Splits a keyword value on `|`, `,`, `;` and whitespace.
fn split_words(value: &str) -> Vec<String> {
    value
        .split(is_text_separator)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a metadata value on `|`, `,`, `;` only, keeping inner spaces.
fn split_names(value: &str) -> Vec<String> {
    value
        .split(TEXT_SEPARATORS)
        .filter_map(segment)
        .collect()
}

/// Splits a text value into words and double-quoted phrases.
fn split_text_terms(value: &str) -> Result<Vec<TextTerm>> {
    if value.chars().filter(|&c| c == '"').count() % 2 == 1 {
        return Err(LogbookError::MalformedQuery(format!(
            "unbalanced quotes in {value:?}"
        )));
    }

    let mut terms = Vec::new();
    for (i, chunk) in value.split('"').enumerate() {
        if i % 2 == 1 {
            if let Some(phrase) = segment(chunk) {
                terms.push(TextTerm::Phrase(phrase));
            }
        } else {
            terms.extend(split_words(chunk).into_iter().map(TextTerm::Word));
        }
    }
    Ok(terms)
}
