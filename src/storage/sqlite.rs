use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::middleware::AppError;
use crate::models::{
    is_set_statement, setting_row, CatalogTable, LogicalRelation, MetastoreRelation, SetCommand,
    TableIdentifier, TableKind,
};
use crate::services::backend::MetadataBackend;
use crate::services::catalog::HostCatalog;

/// SQLite-backed local metastore: catalog tables plus persisted settings
/// Uses tokio::Mutex for async-friendly locking
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        // Handle SQLite URL format (sqlite:./path or sqlite://path)
        let path_str = db_path.as_ref().to_string_lossy();
        let clean_path: &str = if path_str.starts_with("sqlite:") {
            let mut cleaned = path_str.trim_start_matches("sqlite:");
            cleaned = cleaned.trim_start_matches("//");
            cleaned
        } else {
            path_str.as_ref()
        };

        let conn = Connection::open(clean_path)?;
        Self::from_connection(conn).await
    }

    /// In-memory metastore, mostly useful for tests
    #[cfg(test)]
    pub(crate) async fn in_memory() -> SqliteResult<Self> {
        Self::from_connection(Connection::open_in_memory()?).await
    }

    async fn from_connection(conn: Connection) -> SqliteResult<Self> {
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_tables (
                db_name TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                view_sql TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (db_name, name)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(())
    }

    /// Register (or replace) a metastore table, or a view when `view_sql` is given
    pub async fn register_table(
        &self,
        database: &str,
        name: &str,
        view_sql: Option<&str>,
    ) -> SqliteResult<CatalogTable> {
        let table = CatalogTable {
            database: database.trim().to_lowercase(),
            name: name.trim().to_lowercase(),
            kind: if view_sql.is_some() {
                TableKind::View
            } else {
                TableKind::Metastore
            },
            view_sql: view_sql.map(str::to_string),
            created_at: Utc::now(),
        };

        let conn = self.conn.lock().await;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO catalog_tables (db_name, name, kind, view_sql, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            rusqlite::params![
                table.database,
                table.name,
                table.kind.as_str(),
                table.view_sql,
                table.created_at.to_rfc3339(),
            ],
        )?;
        tracing::info!("Registered {} {}.{}", table.kind.as_str(), table.database, table.name);
        Ok(table)
    }

    /// Get a catalog table by database and name
    pub async fn get_table(&self, database: &str, name: &str) -> SqliteResult<Option<CatalogTable>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT db_name, name, kind, view_sql, created_at FROM catalog_tables WHERE db_name = ?1 AND name = ?2",
        )?;
        stmt.query_row(
            rusqlite::params![database.to_lowercase(), name.to_lowercase()],
            Self::map_table,
        )
        .optional()
    }

    /// List all catalog tables
    pub async fn list_tables(&self) -> SqliteResult<Vec<CatalogTable>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT db_name, name, kind, view_sql, created_at FROM catalog_tables ORDER BY db_name, name",
        )?;
        let rows = stmt.query_map([], Self::map_table)?;
        rows.collect()
    }

    /// Drop a catalog table, returning whether it existed
    pub async fn drop_table(&self, database: &str, name: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "DELETE FROM catalog_tables WHERE db_name = ?1 AND name = ?2",
            rusqlite::params![database.to_lowercase(), name.to_lowercase()],
        )?;
        Ok(affected > 0)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"
            INSERT INTO session_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            rusqlite::params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> SqliteResult<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT value FROM session_settings WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
    }

    /// All persisted settings ordered by key
    pub async fn list_settings(&self) -> SqliteResult<Vec<(String, String)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT key, value FROM session_settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        rows.collect()
    }

    fn map_table(row: &rusqlite::Row<'_>) -> SqliteResult<CatalogTable> {
        let kind: String = row.get(2)?;
        let created_at: String = row.get(4)?;
        Ok(CatalogTable {
            database: row.get(0)?,
            name: row.get(1)?,
            kind: TableKind::from_str(&kind).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("unknown table kind '{}'", kind).into(),
                )
            })?,
            view_sql: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
                })?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl HostCatalog for SqliteStorage {
    async fn lookup_relation(
        &self,
        table: &TableIdentifier,
        alias: Option<&str>,
    ) -> Result<LogicalRelation, AppError> {
        let database = table.database_or_default();
        let entry = self
            .get_table(database, &table.table)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Table or view not found: {}.{}", database, table.table))
            })?;

        Ok(match entry.kind {
            TableKind::Metastore => LogicalRelation::Metastore(MetastoreRelation {
                database: entry.database,
                table: entry.name,
                alias: alias.map(str::to_string),
            }),
            TableKind::View => LogicalRelation::View {
                database: entry.database,
                name: entry.name,
                sql: entry.view_sql.unwrap_or_default(),
            },
        })
    }
}

#[async_trait]
impl MetadataBackend for SqliteStorage {
    async fn run_statement(&self, sql: &str) -> Result<Vec<String>, AppError> {
        if !is_set_statement(sql) {
            let conn = self.conn.lock().await;
            conn.execute_batch(sql)?;
            return Ok(Vec::new());
        }

        match SetCommand::parse(sql)? {
            SetCommand::Assign { key, value } => {
                self.set_setting(&key, &value).await?;
                Ok(vec![setting_row(&key, Some(&value))])
            }
            SetCommand::Get(key) => {
                let value = self.get_setting(&key).await?;
                Ok(vec![setting_row(&key, value.as_deref())])
            }
            SetCommand::ListAll => Ok(self
                .list_settings()
                .await?
                .into_iter()
                .map(|(key, value)| setting_row(&key, Some(&value)))
                .collect()),
        }
    }
}
