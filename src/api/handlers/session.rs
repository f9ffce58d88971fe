use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{CreateSessionRequest, RelationQuery, TableIdentifier};

/// List open sessions
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sessions = state.sessions.list_sessions().await;

    Ok(Json(serde_json::json!({
        "sessions": sessions
    })))
}

/// Derive a new session from the root context
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let session = state.sessions.create_session(payload.user).await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "session": session
        })),
    ))
}

/// Close a session and drop its live connection
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove_session(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session '{}' not found", id)))
    }
}

/// Rewrite a table lookup onto the session's live endpoint
pub async fn lookup_relation(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    Query(query): Query<RelationQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let identifier = TableIdentifier::parse(&table)?;
    let context = state.sessions.get_session(&id).await?;
    let context = context.lock().await;

    let relation = context
        .lookup_relation(&identifier, query.alias.as_deref())
        .await?;

    Ok(Json(serde_json::json!({
        "table": identifier.to_string(),
        "relation": relation
    })))
}

/// Read a table's rows through the session's live connection
pub async fn scan_relation(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    Query(query): Query<RelationQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let identifier = TableIdentifier::parse(&table)?;
    let context = state.sessions.get_session(&id).await?;
    let mut context = context.lock().await;

    let rows = context
        .scan_relation(&identifier, query.alias.as_deref())
        .await?;

    Ok(Json(serde_json::json!({
        "table": identifier.to_string(),
        "row_count": rows.len(),
        "rows": rows
    })))
}

/// Endpoint the session would connect to, with secrets masked
pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let context = state.sessions.get_session(&id).await?;
    let context = context.lock().await;
    let endpoint = context.endpoint()?;

    Ok(Json(serde_json::json!({
        "endpoint": endpoint.redacted(),
        "auth": endpoint.auth(),
        "connected": context.is_connected()
    })))
}
