use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived session handed out over the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub user: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(user: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RelationQuery {
    pub alias: Option<String>,
}
