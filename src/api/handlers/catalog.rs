use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::RegisterTableRequest;

/// List tables and views in the local metastore
pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tables = state.storage.list_tables().await?;

    Ok(Json(serde_json::json!({
        "tables": tables
    })))
}

/// Register a metastore table, or a view when `view_sql` is set
pub async fn register_table(
    State(state): State<AppState>,
    Json(payload): Json<RegisterTableRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Table name cannot be empty".to_string()));
    }
    if payload.database.trim().is_empty() {
        return Err(AppError::Validation("Database name cannot be empty".to_string()));
    }
    if let Some(sql) = &payload.view_sql {
        if sql.trim().is_empty() {
            return Err(AppError::Validation("View SQL cannot be empty".to_string()));
        }
    }

    let table = state
        .storage
        .register_table(&payload.database, &payload.name, payload.view_sql.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "table": table
        })),
    ))
}

/// Remove a table or view from the local metastore
pub async fn drop_table(
    State(state): State<AppState>,
    Path((database, name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    if state.storage.drop_table(&database, &name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Table '{}.{}' not found", database, name)))
    }
}
