// Local execution backend on top of DataFusion
//
// SET statements are answered from the shared SqlConf registry (and mirrored
// into DataFusion's own options for `datafusion.*` keys). Function and macro
// DDL is recorded in a routine registry. Everything else is planned and
// executed by the SessionContext.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{
    is_set_statement, setting_row, CommandClassification, FunctionCommand, RoutineKind, SetCommand,
};
use crate::services::backend::ExecutionBackend;
use crate::services::conf::SqlConf;
use crate::services::datafusion::converter::DataFusionResultConverter;
use crate::services::datafusion::session::DataFusionSessionManager;

const DATAFUSION_PREFIX: &str = "datafusion.";

/// Definitions of registered functions and macros, keyed by kind and name
type RoutineRegistry = Arc<RwLock<BTreeMap<(RoutineKind, String), String>>>;

pub struct DataFusionExecutionBackend {
    ctx: SessionContext,
    conf: SqlConf,
    routines: RoutineRegistry,
}

impl DataFusionExecutionBackend {
    pub fn new(ctx: SessionContext, conf: SqlConf) -> Self {
        Self {
            ctx,
            conf,
            routines: RoutineRegistry::default(),
        }
    }

    pub fn with_manager(manager: &DataFusionSessionManager, conf: SqlConf) -> Self {
        Self::new(manager.create_session(), conf)
    }

    #[cfg(test)]
    pub(crate) fn session_context(&self) -> &SessionContext {
        &self.ctx
    }

    async fn run_set(&self, sql: &str) -> Result<Vec<String>, AppError> {
        match SetCommand::parse(sql)? {
            SetCommand::Assign { key, value } => {
                if key.starts_with(DATAFUSION_PREFIX) {
                    self.ctx.sql(sql).await?.collect().await?;
                }
                tracing::debug!("SET {}={}", key, value);
                self.conf.set(key.clone(), value.clone());
                Ok(vec![setting_row(&key, Some(&value))])
            }
            SetCommand::Get(key) => {
                let value = self.conf.get(&key);
                Ok(vec![setting_row(&key, value.as_deref())])
            }
            SetCommand::ListAll => Ok(self
                .conf
                .entries()
                .into_iter()
                .map(|(key, value)| setting_row(&key, Some(&value)))
                .collect()),
        }
    }

    fn run_routine_ddl(&self, sql: &str) -> Result<Vec<String>, AppError> {
        match FunctionCommand::parse(sql)? {
            FunctionCommand::Create {
                kind,
                temporary,
                name,
                definition,
            } => {
                let scope = if temporary { "temporary " } else { "" };
                let previous = self
                    .routines
                    .write()
                    .insert((kind, name.clone()), definition);
                match previous {
                    Some(_) => tracing::info!("Replaced {}{} {}", scope, kind.as_str(), name),
                    None => tracing::info!("Registered {}{} {}", scope, kind.as_str(), name),
                }
                Ok(Vec::new())
            }
            FunctionCommand::Drop {
                kind,
                name,
                if_exists,
                ..
            } => {
                let removed = self.routines.write().remove(&(kind, name.clone()));
                match removed {
                    Some(_) => tracing::info!("Dropped {} {}", kind.as_str(), name),
                    None if if_exists => {}
                    None => {
                        return Err(AppError::NotFound(format!(
                            "{} '{}' does not exist",
                            kind.as_str(),
                            name
                        )))
                    }
                }
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ExecutionBackend for DataFusionExecutionBackend {
    async fn run_statement(&self, sql: &str) -> Result<Vec<String>, AppError> {
        if is_set_statement(sql) {
            return self.run_set(sql).await;
        }
        if CommandClassification::classify(sql) == CommandClassification::FunctionOrMacroDdl {
            return self.run_routine_ddl(sql);
        }

        let batches = self.ctx.sql(sql).await?.collect().await?;
        DataFusionResultConverter::batches_to_rows(&batches)
            .map_err(|e| AppError::Database(format!("Failed to render result rows: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conf::JDBC_URL_KEY;

    fn backend() -> (DataFusionExecutionBackend, SqlConf) {
        let conf = SqlConf::new();
        let backend =
            DataFusionExecutionBackend::with_manager(&DataFusionSessionManager::default_config(), conf.clone());
        (backend, conf)
    }

    #[tokio::test]
    async fn test_select_rows() {
        let (backend, _) = backend();
        let rows = backend
            .run_statement("SELECT 1 AS id, 'x' AS name UNION ALL SELECT 2, NULL ORDER BY id")
            .await
            .unwrap();
        assert_eq!(rows, vec!["1\tx", "2\tNULL"]);
    }

    #[tokio::test]
    async fn test_set_updates_shared_conf() {
        let (backend, conf) = backend();
        let rows = backend
            .run_statement("SET hiveserver2.jdbc.url=jdbc:hive2://live:10000/default")
            .await
            .unwrap();
        assert_eq!(rows, vec!["hiveserver2.jdbc.url=jdbc:hive2://live:10000/default"]);
        assert_eq!(
            conf.get(JDBC_URL_KEY).as_deref(),
            Some("jdbc:hive2://live:10000/default")
        );

        let rows = backend.run_statement("set hiveserver2.jdbc.url").await.unwrap();
        assert_eq!(rows, vec!["hiveserver2.jdbc.url=jdbc:hive2://live:10000/default"]);

        let rows = backend.run_statement("SET missing.key").await.unwrap();
        assert_eq!(rows, vec!["missing.key=<undefined>"]);
    }

    #[tokio::test]
    async fn test_set_lists_sorted_pairs() {
        let (backend, conf) = backend();
        conf.set("b.key", "2");
        conf.set("a.key", "1");
        let rows = backend.run_statement("SET").await.unwrap();
        assert_eq!(rows, vec!["a.key=1", "b.key=2"]);
    }

    #[tokio::test]
    async fn test_set_datafusion_option() {
        let (backend, _) = backend();
        backend
            .run_statement("SET datafusion.execution.batch_size = 512")
            .await
            .unwrap();
        assert_eq!(backend.session_context().copied_config().batch_size(), 512);
    }

    #[tokio::test]
    async fn test_function_and_macro_ddl_is_recorded() {
        let (backend, _) = backend();
        for sql in [
            "CREATE TEMPORARY FUNCTION f AS 'com.example.F'",
            "CREATE TEMPORARY FUNCTION f AS 'com.example.G'",
            "CREATE TEMPORARY MACRO sq(x INT) x * x",
        ] {
            assert!(backend.run_statement(sql).await.unwrap().is_empty(), "{}", sql);
        }
        assert_eq!(
            backend.routines.read().get(&(RoutineKind::Function, "f".to_string())),
            Some(&"AS 'com.example.G'".to_string())
        );

        assert!(backend.run_statement("DROP TEMPORARY MACRO sq").await.unwrap().is_empty());
        assert!(backend.run_statement("DROP TEMPORARY MACRO IF EXISTS sq").await.is_ok());
        let err = backend.run_statement("DROP TEMPORARY MACRO sq").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // functions and macros live in separate namespaces
        let err = backend.run_statement("DROP TEMPORARY MACRO f").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(backend.run_statement("drop temporary function f").await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_function_ddl_is_invalid_sql() {
        let (backend, _) = backend();
        let err = backend
            .run_statement("DROP FUNCTION f trailing words")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSql(_)));
    }

    #[tokio::test]
    async fn test_invalid_sql_is_an_error() {
        let (backend, _) = backend();
        let err = backend.run_statement("SELEC nonsense").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
