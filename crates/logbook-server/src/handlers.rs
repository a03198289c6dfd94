//! HTTP request handlers for the logbook API.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::Uri;
use logbook_core::{
    LogEntry, LogEntryBuilder, LogId, Logbook, LogbookService, MasterCatalog, MasterRecord,
    Property, SearchQuery, SearchResult, Tag, VisibilityFilter, validate_raw_query,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is answering.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Query parameters accepted by the master record listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// Include inactive records when present as a bare flag or `true`.
    pub inactive: Option<String>,
}

impl ListParams {
    fn visibility(&self) -> VisibilityFilter {
        let include = self.inactive.as_deref().is_some_and(|value| {
            let value = value.trim();
            value.is_empty() || value.eq_ignore_ascii_case("true")
        });
        VisibilityFilter::new(include)
    }
}

/// Master record kinds served under `/{kind}`.
pub trait Catalogued: MasterRecord + Serialize + DeserializeOwned {
    /// The catalog holding this kind of record.
    fn catalog(service: &LogbookService) -> &MasterCatalog<Self>;
}

impl Catalogued for Logbook {
    fn catalog(service: &LogbookService) -> &MasterCatalog<Self> {
        service.logbooks()
    }
}

impl Catalogued for Tag {
    fn catalog(service: &LogbookService) -> &MasterCatalog<Self> {
        service.tags()
    }
}

impl Catalogued for Property {
    fn catalog(service: &LogbookService) -> &MasterCatalog<Self> {
        service.properties()
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Search entries, returning only the matching page.
pub async fn find_logs(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let query = search_query(&uri)?;
    let result = state.service().search(&query)?;
    Ok(Json(result.logs))
}

/// Search entries, returning the hit count alongside the page.
pub async fn search_logs(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> ApiResult<Json<SearchResult>> {
    let query = search_query(&uri)?;
    Ok(Json(state.service().search(&query)?))
}

/// Get a single entry by id.
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<LogEntry>> {
    let id = parse_log_id(&id)?;
    Ok(Json(state.service().get_log(id)?))
}

/// Create an entry from the request body.
pub async fn create_log(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LogEntryBuilder>, JsonRejection>,
) -> ApiResult<Json<LogEntry>> {
    let Json(draft) = payload?;
    Ok(Json(state.service().create_log(draft)?))
}

/// Replace the entry at `id` with the request body.
pub async fn replace_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<LogEntryBuilder>, JsonRejection>,
) -> ApiResult<Json<LogEntry>> {
    let id = parse_log_id(&id)?;
    let Json(update) = payload?;
    Ok(Json(state.service().replace_log(id, update)?))
}

/// List records of one kind.
pub async fn list_records<T: Catalogued>(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<T>>> {
    Ok(Json(T::catalog(state.service()).list(params.visibility())?))
}

/// Get one record by name.
pub async fn get_record<T: Catalogued>(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<T>> {
    Ok(Json(T::catalog(state.service()).get(&name)?))
}

/// Create or replace the record at `name`.
pub async fn put_record<T: Catalogued>(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<Json<T>> {
    let Json(record) = payload?;
    Ok(Json(T::catalog(state.service()).put(&name, record)?))
}

/// Soft-delete the record at `name`.
pub async fn delete_record<T: Catalogued>(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<T>> {
    Ok(Json(T::catalog(state.service()).deactivate(&name)?))
}

fn search_query(uri: &Uri) -> ApiResult<SearchQuery> {
    validate_raw_query(uri.query().unwrap_or_default())?;
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)?;
    Ok(SearchQuery::from_pairs(pairs))
}

fn parse_log_id(raw: &str) -> ApiResult<LogId> {
    raw.parse::<u64>()
        .map(LogId)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid log id: {raw}")))
}
