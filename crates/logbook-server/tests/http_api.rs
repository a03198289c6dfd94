//! End-to-end tests of the HTTP API.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use logbook_core::{
    Backends, LogRepository, Logbook, MemoryCounterStore, MemoryIndex, SearchBackend, Tag,
    config::DEFAULT_SEQUENCE_SPACE,
};
use logbook_server::{AppState, ServerConfig, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn seeded_state(backends: Backends) -> Arc<AppState> {
    let state = AppState::with_backends(ServerConfig::default(), backends);
    state
        .service()
        .logbooks()
        .put("Operations", Logbook::new("Operations", "admin"))
        .unwrap();
    state.service().tags().put("RF", Tag::new("RF")).unwrap();
    Arc::new(state)
}

async fn call(state: &Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn entry(title: &str, description: &str) -> Value {
    json!({
        "title": title,
        "description": description,
        "owner": "operator",
        "logbooks": [{ "name": "Operations" }],
    })
}

// ===== Search Tests =====

#[tokio::test]
async fn search_pages_report_the_full_hit_count() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    for i in 0..5 {
        let (status, _) = call(&state, "PUT", "/logs", Some(entry(&format!("shift {i}"), "beam on"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, page) = call(&state, "GET", "/logs/search?desc=beam&size=2&from=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["hitCount"], 5);
    assert_eq!(page["logs"].as_array().map(Vec::len), Some(2));
    assert_eq!(page["logs"][0]["title"], "shift 3");

    let (status, logs) = call(&state, "GET", "/logs?desc=beam&sort=asc&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs[0]["title"], "shift 0");
}

#[tokio::test]
async fn quoted_phrases_and_tags_combine() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let mut tagged = entry("a", "check complete");
    tagged["tags"] = json!([{ "name": "RF" }]);
    call(&state, "PUT", "/logs", Some(tagged)).await;
    call(&state, "PUT", "/logs", Some(entry("b", "complete the check"))).await;

    let (_, phrase) = call(&state, "GET", "/logs/search?desc=%22check%20complete%22", None).await;
    assert_eq!(phrase["hitCount"], 1);

    let (_, words) = call(&state, "GET", "/logs/search?desc=check%20complete", None).await;
    assert_eq!(words["hitCount"], 2);

    let (_, both) = call(&state, "GET", "/logs/search?desc=complete&tags=RF", None).await;
    assert_eq!(both["hitCount"], 1);
    assert_eq!(both["logs"][0]["title"], "a");
}

#[tokio::test]
async fn unknown_parameters_and_bad_times_still_answer() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    call(&state, "PUT", "/logs", Some(entry("a", ""))).await;

    let (status, result) = call(&state, "GET", "/logs/search?colour=blue&start=whenever", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["hitCount"], 1);

    let (status, body) = call(&state, "GET", "/logs/search?start=1%20hour&end=2%20hours", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_query");
}

#[tokio::test]
async fn time_zone_parameter_is_validated() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    call(&state, "PUT", "/logs", Some(entry("a", ""))).await;

    let (status, result) = call(&state, "GET", "/logs/search?start=2000-01-01&tz=Europe%2FStockholm", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["hitCount"], 1);

    let (status, body) = call(&state, "GET", "/logs/search?tz=foo%2Fbar", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed_query");
}

// ===== Entry Lifecycle Tests =====

#[tokio::test]
async fn replace_keeps_identity_and_creation_date() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let (_, created) = call(&state, "PUT", "/logs", Some(entry("draft", "first"))).await;
    let id = created["id"].as_u64().unwrap();

    let mut update = entry("final", "second");
    update["id"] = json!(id);
    let (status, replaced) = call(&state, "POST", &format!("/logs/{id}"), Some(update)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["id"], created["id"]);
    assert_eq!(replaced["createdDate"], created["createdDate"]);
    assert_eq!(replaced["title"], "final");
    assert!(replaced["modifyDate"].is_string());
}

#[tokio::test]
async fn replace_rejects_mismatched_or_unknown_ids() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let (_, created) = call(&state, "PUT", "/logs", Some(entry("draft", ""))).await;
    let id = created["id"].as_u64().unwrap();

    let mut update = entry("final", "");
    update["id"] = json!(id + 100);
    let (status, _) = call(&state, "POST", &format!("/logs/{id}"), Some(update.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&state, "POST", &format!("/logs/{}", id + 100), Some(update)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let request = Request::builder()
        .method("PUT")
        .uri("/logs")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn inactive_logbook_rejects_new_entries() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let (status, _) = call(&state, "DELETE", "/logbooks/Operations", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&state, "PUT", "/logs", Some(entry("late", ""))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("inactive"));
}

#[tokio::test]
async fn property_name_must_match_path() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let property = json!({ "name": "Ticket", "attributes": [{ "name": "id" }] });

    let (status, _) = call(&state, "PUT", "/properties/Other", Some(property.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = call(&state, "PUT", "/properties/Ticket", Some(property)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["attributes"][0]["name"], "id");

    let null_attributes = json!({ "name": "Ticket", "attributes": null });
    let (status, body) = call(&state, "PUT", "/properties/Ticket", Some(null_attributes)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn created_entries_ignore_requested_state() {
    let state = seeded_state(Backends::in_memory(DEFAULT_SEQUENCE_SPACE));
    let mut draft = entry("retired", "");
    draft["state"] = json!("Inactive");

    let (status, created) = call(&state, "PUT", "/logs", Some(draft)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["state"], "Active");

    let (_, result) = call(&state, "GET", "/logs/search", None).await;
    assert_eq!(result["hitCount"], 1);
}

// ===== Store Failure Tests =====

#[tokio::test]
async fn unreachable_index_is_service_unavailable() {
    let index = Arc::new(MemoryIndex::new());
    let mut backends = Backends::in_memory(DEFAULT_SEQUENCE_SPACE);
    backends.logs = Arc::clone(&index) as Arc<dyn LogRepository>;
    backends.search = Arc::clone(&index) as Arc<dyn SearchBackend>;
    let state = seeded_state(backends);

    index.set_offline(true);
    let (status, body) = call(&state, "GET", "/logs/search", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");

    index.set_offline(false);
    let (status, _) = call(&state, "GET", "/logs/search", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_counter_space_is_internal_error() {
    let mut backends = Backends::in_memory(DEFAULT_SEQUENCE_SPACE);
    backends.counters = Arc::new(MemoryCounterStore::new());
    let state = seeded_state(backends);

    let (status, body) = call(&state, "PUT", "/logs", Some(entry("orphan", ""))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
}
