//! End-to-end search behavior through the logbook service.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use logbook_core::{
    Backends, LogEntry, LogEntryBuilder, LogId, LogRepository, Logbook, LogbookError,
    LogbookService, MemoryIndex, Property, SearchBackend, SearchQuery, ServiceConfig, State, Tag,
    TemporalAmount, VisibilityFilter, time::parse_temporal_amount,
};

fn service() -> LogbookService {
    let service = LogbookService::in_memory(ServiceConfig::default());
    for name in ["Operations", "Controls"] {
        service
            .logbooks()
            .put(name, Logbook::new(name, "admin"))
            .expect("logbook");
    }
    for name in ["Cryo", "cryo", "Cryogenics", "RF"] {
        service.tags().put(name, Tag::new(name)).expect("tag");
    }
    service
}

fn entry(title: &str, description: &str) -> LogEntryBuilder {
    LogEntry::builder()
        .title(title)
        .description(description)
        .owner("operator")
        .logbook(Logbook::new("Operations", "admin"))
}

fn ids(service: &LogbookService, query: &SearchQuery) -> HashSet<LogId> {
    service
        .search(query)
        .expect("search")
        .logs
        .iter()
        .map(LogEntry::id)
        .collect()
}

// ===========================================
// Format/parse round trip
// ===========================================

#[test]
fn formatted_amounts_parse_back() {
    for text in ["3 days 20 mins 10 sec", "1 year 2 months 3 days", "2 hours 5 ms", "now"] {
        let amount = parse_temporal_amount(text).expect("parse");
        let again = parse_temporal_amount(&amount.to_string()).expect("reparse");
        assert!(again.equivalent(&amount), "{text}: {amount} vs {again}");
    }
    assert_eq!(parse_temporal_amount("now").expect("parse"), TemporalAmount::ZERO);
}

// ===========================================
// Tag case sensitivity and wildcards
// ===========================================

#[test]
fn tag_names_are_case_sensitive() {
    let service = service();
    let upper = service
        .create_log(entry("a", "").tag(Tag::new("Cryo")))
        .expect("create");
    let lower = service
        .create_log(entry("b", "").tag(Tag::new("cryo")))
        .expect("create");

    assert_eq!(ids(&service, &SearchQuery::new().with("tags", "Cryo")), HashSet::from([upper.id()]));
    assert_eq!(ids(&service, &SearchQuery::new().with("tags", "cryo")), HashSet::from([lower.id()]));
}

#[test]
fn tag_wildcards() {
    let service = service();
    let cryo = service
        .create_log(entry("a", "").tag(Tag::new("Cryo")))
        .expect("create");
    let cryogenics = service
        .create_log(entry("b", "").tag(Tag::new("Cryogenics")))
        .expect("create");
    service
        .create_log(entry("c", "").tag(Tag::new("RF")))
        .expect("create");

    assert_eq!(ids(&service, &SearchQuery::new().with("tags", "Cry?")), HashSet::from([cryo.id()]));
    assert_eq!(
        ids(&service, &SearchQuery::new().with("tags", "Cryo*")),
        HashSet::from([cryo.id(), cryogenics.id()])
    );
    assert!(ids(&service, &SearchQuery::new().with("tags", "Cr?")).is_empty());
}

// ===========================================
// OR within a field, AND across fields
// ===========================================

#[test]
fn or_within_field_and_across_fields() {
    let service = service();
    let check = service
        .create_log(entry("Shift start", "check the vacuum").tag(Tag::new("RF")))
        .expect("create");
    let complete = service
        .create_log(entry("Shift end", "work complete"))
        .expect("create");
    service
        .create_log(entry("Other", "unrelated"))
        .expect("create");

    let repeated = SearchQuery::new().with("desc", "check").with("desc", "complete");
    let joined = SearchQuery::new().with("desc", "check complete");
    assert_eq!(ids(&service, &repeated), HashSet::from([check.id(), complete.id()]));
    assert_eq!(ids(&service, &repeated), ids(&service, &joined));

    let across = SearchQuery::new().with("desc", "check complete").with("tags", "RF");
    assert_eq!(ids(&service, &across), HashSet::from([check.id()]));
}

#[test]
fn phrase_results_are_a_subset_of_term_results() {
    let service = service();
    let adjacent = service
        .create_log(entry("a", "beam dump check complete"))
        .expect("create");
    service
        .create_log(entry("b", "complete the check"))
        .expect("create");

    let phrase = ids(&service, &SearchQuery::new().with("phrase", "check complete"));
    let terms = ids(&service, &SearchQuery::new().with("desc", "check complete"));

    assert_eq!(phrase, HashSet::from([adjacent.id()]));
    assert!(phrase.is_subset(&terms));
    assert_eq!(terms.len(), 2);
}

// ===========================================
// Concurrent id allocation
// ===========================================

#[test]
fn concurrent_creates_get_distinct_increasing_ids() {
    let service = Arc::new(service());
    let before = service.create_log(entry("first", "")).expect("create").id();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        service
                            .create_log(entry(&format!("t{t} e{i}"), ""))
                            .expect("create")
                            .id()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("thread") {
            assert!(id > before);
            assert!(seen.insert(id));
        }
    }
    assert_eq!(seen.len(), 200);
}

// ===========================================
// Visibility
// ===========================================

#[test]
fn deactivated_logbook_visibility_and_creation() {
    let service = service();
    service.logbooks().deactivate("Controls").expect("deactivate");

    let visible: Vec<String> = service
        .logbooks()
        .list(VisibilityFilter::default())
        .expect("list")
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(visible, vec!["Operations"]);
    assert_eq!(service.logbooks().list(VisibilityFilter::ALL).expect("list").len(), 2);

    let err = service
        .create_log(entry("x", "").logbook(Logbook::new("Controls", "admin")))
        .expect_err("inactive logbook");
    assert!(matches!(err, LogbookError::Validation(_)));
}

#[test]
fn entries_keep_references_to_deactivated_logbooks() {
    let service = service();
    let created = service
        .create_log(entry("x", "").logbook(Logbook::new("Controls", "admin")))
        .expect("create");
    service.logbooks().deactivate("Controls").expect("deactivate");

    let found = ids(&service, &SearchQuery::new().with("logbooks", "Controls"));
    assert_eq!(found, HashSet::from([created.id()]));
}

#[test]
fn inactive_entries_need_the_override() {
    let index = Arc::new(MemoryIndex::new());
    let mut backends = Backends::in_memory(&ServiceConfig::default().sequence_space);
    backends.logs = Arc::clone(&index) as Arc<dyn LogRepository>;
    backends.search = Arc::clone(&index) as Arc<dyn SearchBackend>;
    let service = LogbookService::new(ServiceConfig::default(), backends);

    let retired = entry("retired", "")
        .id(LogId(500))
        .state(State::Inactive)
        .created_date(Utc::now())
        .build()
        .expect("build");
    index.save(retired).expect("save");

    assert!(ids(&service, &SearchQuery::new()).is_empty());
    assert_eq!(
        ids(&service, &SearchQuery::new().with("inactive", "true")),
        HashSet::from([LogId(500)])
    );
}

#[test]
fn created_entries_are_always_active() {
    let service = service();
    let created = service
        .create_log(entry("retired", "").state(State::Inactive))
        .expect("create");

    assert_eq!(created.state(), State::Active);
    assert_eq!(ids(&service, &SearchQuery::new()), HashSet::from([created.id()]));
}

// ===========================================
// Fuzzy title matching
// ===========================================

#[test]
fn fuzzy_title_matching() {
    let service = service();
    let shift = service.create_log(entry("Shift", "")).expect("create");

    for (term, expected) in [("Shif", true), ("Shif?", true), ("Shi??", false)] {
        let query = SearchQuery::new().with_flag("fuzzy").with("title", term);
        assert_eq!(
            ids(&service, &query).contains(&shift.id()),
            expected,
            "fuzzy title={term}"
        );
    }
}

// ===========================================
// Properties and time windows
// ===========================================

#[test]
fn property_paths_filter_entries() {
    let service = service();
    let ticketed = service
        .create_log(entry("a", "").property(Property::new("Ticket").with_attribute("id", "OPS-42")))
        .expect("create");
    service.create_log(entry("b", "")).expect("create");

    assert_eq!(
        ids(&service, &SearchQuery::new().with("properties", "Ticket.id.OPS-*")),
        HashSet::from([ticketed.id()])
    );
    assert_eq!(ids(&service, &SearchQuery::new().with_flag("properties")).len(), 2);
}

#[test]
fn time_windows() {
    let service = service();
    service.create_log(entry("recent", "")).expect("create");

    assert_eq!(ids(&service, &SearchQuery::new().with("start", "1 hour")).len(), 1);
    assert!(ids(&service, &SearchQuery::new().with("end", "1 hour")).is_empty());
    assert_eq!(ids(&service, &SearchQuery::new().with("start", "yesterday-ish")).len(), 1);

    let inverted = service.search(
        &SearchQuery::new()
            .with("start", "1 hour")
            .with("end", "2 hours"),
    );
    assert!(matches!(inverted, Err(LogbookError::MalformedQuery(_))));
}

#[test]
fn absolute_bounds_follow_the_requested_zone() {
    let service = service();
    service.create_log(entry("recent", "")).expect("create");

    let start = (Utc::now() + chrono::Duration::hours(13))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    assert!(ids(&service, &SearchQuery::new().with("start", start.as_str())).is_empty());
    assert_eq!(
        ids(
            &service,
            &SearchQuery::new().with("start", start.as_str()).with("tz", "Etc/GMT-14")
        )
        .len(),
        1
    );

    let unknown = service.search(&SearchQuery::new().with("tz", "foo/bar"));
    assert!(matches!(unknown, Err(LogbookError::MalformedQuery(_))));
}
