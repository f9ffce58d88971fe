use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{catalog, session, sql, AppState};
use crate::api::middleware::AppError;
use crate::config::Config;
use crate::services::{LiveSqlContext, SessionManager};
use crate::storage::SqliteStorage;

/// Create router with application state built from configuration
pub fn create_router_with_state(storage: Arc<SqliteStorage>, config: Config) -> Result<Router, AppError> {
    let root = LiveSqlContext::from_config(&config, storage.clone())?;

    let state = AppState {
        storage,
        sessions: Arc::new(SessionManager::new(root)),
    };

    Ok(create_router(state))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/sessions",
            get(session::list_sessions).post(session::create_session),
        )
        .route("/api/sessions/{id}", axum::routing::delete(session::delete_session))
        .route("/api/sessions/{id}/sql", post(sql::execute_sql))
        .route(
            "/api/sessions/{id}/relations/{table}",
            get(session::lookup_relation),
        )
        .route(
            "/api/sessions/{id}/relations/{table}/rows",
            get(session::scan_relation),
        )
        .route("/api/sessions/{id}/endpoint", get(session::get_endpoint))
        .route(
            "/api/catalog/tables",
            get(catalog::list_tables).post(catalog::register_table),
        )
        .route(
            "/api/catalog/tables/{database}/{name}",
            axum::routing::delete(catalog::drop_table),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
