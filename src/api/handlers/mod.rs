pub mod catalog;
pub mod session;
pub mod sql;

use std::sync::Arc;

use crate::services::SessionManager;
use crate::storage::SqliteStorage;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SqliteStorage>,
    pub sessions: Arc<SessionManager>,
}
