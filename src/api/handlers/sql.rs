use axum::{
    extract::{Path, State},
    Json,
};
use std::time::Instant;

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{CommandClassification, SqlRequest, SqlResponse};

/// Execute a statement within a session
pub async fn execute_sql(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SqlRequest>,
) -> Result<Json<SqlResponse>, AppError> {
    if payload.statement.trim().is_empty() {
        return Err(AppError::Validation("SQL statement cannot be empty".to_string()));
    }

    let classification = CommandClassification::classify(&payload.statement);
    tracing::info!(
        "Executing {} statement in session {}",
        classification.as_str(),
        id
    );

    let context = state.sessions.get_session(&id).await?;
    let mut context = context.lock().await;

    let started = Instant::now();
    let rows = context.sql(&payload.statement).await.map_err(|e| {
        tracing::warn!("Statement failed in session {}: {}", id, e);
        e
    })?;
    let elapsed = started.elapsed().as_millis() as u64;

    Ok(Json(SqlResponse::new(classification, rows, elapsed)))
}
