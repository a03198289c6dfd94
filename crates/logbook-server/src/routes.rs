//! Route configuration for the logbook API.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use logbook_core::{Logbook, Property, Tag};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{
    create_log, delete_record, find_logs, get_log, get_record, health_check, list_records,
    put_record, replace_log, search_logs,
};
use crate::state::AppState;

/// Create the logbook API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(state.config());

    Router::new()
        .route("/health", get(health_check))
        // Log entries
        .route("/logs", get(find_logs).put(create_log))
        .route("/logs/search", get(search_logs))
        .route("/logs/{id}", get(get_log).post(replace_log))
        // Master records
        .route("/logbooks", get(list_records::<Logbook>))
        .route(
            "/logbooks/{name}",
            get(get_record::<Logbook>)
                .put(put_record::<Logbook>)
                .delete(delete_record::<Logbook>),
        )
        .route("/tags", get(list_records::<Tag>))
        .route(
            "/tags/{name}",
            get(get_record::<Tag>)
                .put(put_record::<Tag>)
                .delete(delete_record::<Tag>),
        )
        .route("/properties", get(list_records::<Property>))
        .route(
            "/properties/{name}",
            get(get_record::<Property>)
                .put(put_record::<Property>)
                .delete(delete_record::<Property>),
        )
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
