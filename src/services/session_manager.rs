use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::api::middleware::AppError;
use crate::models::SessionInfo;
use crate::services::context::LiveSqlContext;
use crate::services::identity::{HasIdentity, StaticIdentity};

/// A session's context, locked for the duration of each statement
pub type SharedContext = Arc<Mutex<LiveSqlContext>>;

struct SessionEntry {
    info: SessionInfo,
    context: SharedContext,
}

/// Keeps derived sessions of a root context, keyed by session id
///
/// Each session owns its own connection cache, so statements of different
/// sessions never share a live connection.
pub struct SessionManager {
    root: LiveSqlContext,
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionManager {
    pub fn new(root: LiveSqlContext) -> Self {
        Self {
            root,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &LiveSqlContext {
        &self.root
    }

    /// Derive a new session; `user` becomes its identity capability
    pub async fn create_session(&self, user: Option<String>) -> SessionInfo {
        let user = user.filter(|u| !u.trim().is_empty());
        let context = match &user {
            Some(user) => {
                let capability: Arc<dyn HasIdentity> = Arc::new(StaticIdentity(user.clone()));
                self.root.new_session_with_identity(Some(capability))
            }
            None => self.root.new_session(),
        };

        let info = SessionInfo::new(user);
        tracing::info!("Created session {} (user: {:?})", info.id, info.user);

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            info.id.clone(),
            SessionEntry {
                info: info.clone(),
                context: Arc::new(Mutex::new(context)),
            },
        );
        info
    }

    pub async fn get_session(&self, id: &str) -> Result<SharedContext, AppError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|entry| entry.context.clone())
            .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", id)))
    }

    /// Drop a session and its connection; returns whether it existed
    pub async fn remove_session(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            tracing::info!("Closed session {}", id);
        }
        removed
    }

    pub async fn list_sessions(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions.values().map(|e| e.info.clone()).collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conf::{SqlConf, JDBC_URL_KEY};
    use crate::services::identity::IdentityResolver;
    use crate::services::testing::{CallLog, MockConnector, RecordingBackend};
    use crate::storage::SqliteStorage;

    fn nobody() -> Option<String> {
        None
    }

    async fn manager(connector: Arc<MockConnector>) -> SessionManager {
        let log = CallLog::default();
        let storage = Arc::new(SqliteStorage::in_memory().await.unwrap());
        let root = LiveSqlContext::builder()
            .with_conf(SqlConf::from_pairs([(
                JDBC_URL_KEY,
                "jdbc:hive2://live:10000/default;user=${user}",
            )]))
            .with_identity(IdentityResolver::new(None).with_os_user(nobody))
            .with_metadata(RecordingBackend::new("metadata", &log, &[]))
            .with_execution(RecordingBackend::new("execution", &log, &[]))
            .with_connector(connector)
            .with_catalog(storage)
            .build()
            .unwrap();
        SessionManager::new(root)
    }

    #[tokio::test]
    async fn test_create_and_remove_session() {
        let manager = manager(MockConnector::new(&CallLog::default(), &[])).await;
        let info = manager.create_session(Some("alice".to_string())).await;

        assert_eq!(manager.list_sessions().await.len(), 1);
        let ctx = manager.get_session(&info.id).await.unwrap();
        assert_eq!(
            ctx.lock().await.endpoint().unwrap().url(),
            "jdbc:hive2://live:10000/default;user=alice"
        );

        assert!(manager.remove_session(&info.id).await);
        assert!(!manager.remove_session(&info.id).await);
        assert!(matches!(
            manager.get_session(&info.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_user_falls_back_to_root_identity() {
        let manager = manager(MockConnector::new(&CallLog::default(), &[])).await;
        let info = manager.create_session(Some("  ".to_string())).await;

        assert!(info.user.is_none());
        let ctx = manager.get_session(&info.id).await.unwrap();
        assert_eq!(
            ctx.lock().await.endpoint().unwrap().url(),
            "jdbc:hive2://live:10000/default;user="
        );
    }

    #[tokio::test]
    async fn test_sessions_open_separate_connections() {
        let connector = MockConnector::new(&CallLog::default(), &[]);
        let manager = manager(connector.clone()).await;
        let first = manager.create_session(None).await;
        let second = manager.create_session(None).await;

        for id in [&first.id, &second.id] {
            let ctx = manager.get_session(id).await.unwrap();
            let mut ctx = ctx.lock().await;
            ctx.sql("SHOW TABLES").await.unwrap();
            ctx.sql("SHOW DATABASES").await.unwrap();
        }

        assert_eq!(connector.connect_count(), 2);
        assert!(!manager.root().is_connected());
        assert_eq!(manager.list_sessions().await.len(), 2);
    }
}
