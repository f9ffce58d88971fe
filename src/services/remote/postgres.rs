// Live connector for endpoints speaking the PostgreSQL wire protocol
use crate::api::middleware::AppError;
use crate::models::ConnectionEndpoint;
use crate::services::remote::{RemoteConnection, RemoteConnector, RowCursor};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage, SimpleQueryRow};
use url::Url;

const DEFAULT_PORT: u16 = 5432;
const APPLICATION_NAME: &str = "hive-live-backend";

/// Connection settings extracted from a live endpoint string
#[derive(Debug, Clone, PartialEq, Eq)]
struct PgEndpoint {
    host: String,
    port: u16,
    dbname: Option<String>,
    user: Option<String>,
    password: Option<String>,
    /// Remaining `;key=value` session variables, passed as runtime parameters
    parameters: Vec<(String, String)>,
}

impl PgEndpoint {
    /// Parse `[jdbc:]postgres[ql]://[user[:password]@]host[:port][/db][;key=value]*`
    fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim();
        let raw = raw.strip_prefix("jdbc:").unwrap_or(raw);
        let mut parts = raw.split(';');
        let base = parts.next().unwrap_or_default();

        let url = Url::parse(base)
            .map_err(|e| AppError::Validation(format!("Invalid live endpoint URL: {}", e)))?;
        if url.scheme() != "postgresql" && url.scheme() != "postgres" {
            return Err(AppError::Validation(format!(
                "Live endpoint must use postgresql:// or postgres:// (got {}://)",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::Validation("Live endpoint URL has no host".to_string()))?
            .to_string();
        let dbname = Some(url.path().trim_matches('/'))
            .filter(|db| !db.is_empty())
            .map(str::to_string);

        let mut endpoint = Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            dbname,
            user: Some(url.username()).filter(|u| !u.is_empty()).map(str::to_string),
            password: url.password().map(str::to_string),
            parameters: Vec::new(),
        };

        for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                AppError::Validation(format!("Malformed session variable '{}' in live endpoint", part))
            })?;
            match key.trim() {
                "principal" => {
                    return Err(AppError::Connection(
                        "Kerberos principal authentication is not supported by the PostgreSQL wire connector"
                            .to_string(),
                    ))
                }
                "auth" => {
                    return Err(AppError::Connection(format!(
                        "Authentication mode '{}' is not supported by the PostgreSQL wire connector",
                        value.trim()
                    )))
                }
                // An empty user comes from an unresolved ${user} placeholder
                "user" => {
                    if !value.trim().is_empty() {
                        endpoint.user = Some(value.trim().to_string());
                    }
                }
                "password" => endpoint.password = Some(value.to_string()),
                other => endpoint
                    .parameters
                    .push((other.to_string(), value.trim().to_string())),
            }
        }

        Ok(endpoint)
    }

    fn to_config(&self, fallback_user: Option<&str>) -> Result<tokio_postgres::Config, AppError> {
        let user = self
            .user
            .as_deref()
            .or(fallback_user)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Connection("No user available for the live connection".to_string()))?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(user)
            .application_name(APPLICATION_NAME);
        if let Some(dbname) = &self.dbname {
            config.dbname(dbname);
        }
        if let Some(password) = &self.password {
            config.password(password);
        }
        if !self.parameters.is_empty() {
            let options = self
                .parameters
                .iter()
                .map(|(k, v)| format!("-c {}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            config.options(&options);
        }
        Ok(config)
    }
}

fn map_pg_error(context: &str, e: tokio_postgres::Error) -> AppError {
    let error_details = if let Some(db_error) = e.as_db_error() {
        format!(
            "Code: {}, Message: {}",
            db_error.code().code(),
            db_error.message()
        )
    } else {
        format!("{}", e)
    };
    AppError::Database(format!("{}: {}", context, error_details))
}

/// Connector for live endpoints behind a PostgreSQL-compatible gateway
#[derive(Debug, Default, Clone)]
pub struct PgWireConnector;

impl PgWireConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RemoteConnector for PgWireConnector {
    async fn connect(
        &self,
        endpoint: &ConnectionEndpoint,
        user: Option<&str>,
    ) -> Result<Arc<dyn RemoteConnection>, AppError> {
        let config = PgEndpoint::parse(endpoint.url())?.to_config(user)?;

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            AppError::Connection(format!(
                "Failed to connect to live endpoint {}: {}",
                endpoint.redacted(),
                e
            ))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Live connection terminated: {}", e);
            }
        });

        tracing::info!("Connected to live endpoint {}", endpoint.redacted());
        Ok(Arc::new(PgConnection { client }))
    }
}

struct PgConnection {
    client: Client,
}

#[async_trait]
impl RemoteConnection for PgConnection {
    async fn execute_query(&self, sql: &str) -> Result<Box<dyn RowCursor>, AppError> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| map_pg_error("Query execution failed", e))?;

        let rows: Vec<SimpleQueryRow> = messages
            .into_iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(row),
                _ => None,
            })
            .collect();

        Ok(Box::new(PgCursor::new(rows)))
    }

    async fn execute_update(&self, sql: &str) -> Result<(), AppError> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| map_pg_error("Statement execution failed", e))
    }
}

/// Cursor over rows already fetched through the simple-query protocol
struct PgCursor {
    rows: std::vec::IntoIter<SimpleQueryRow>,
    current: Option<SimpleQueryRow>,
    closed: bool,
}

impl PgCursor {
    fn new(rows: Vec<SimpleQueryRow>) -> Self {
        Self {
            rows: rows.into_iter(),
            current: None,
            closed: false,
        }
    }
}

#[async_trait]
impl RowCursor for PgCursor {
    async fn next(&mut self) -> Result<bool, AppError> {
        if self.closed {
            return Err(AppError::Database("Cursor is closed".to_string()));
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn column_count(&self) -> usize {
        self.current.as_ref().map_or(0, SimpleQueryRow::len)
    }

    fn get_string(&self, column: usize) -> Result<Option<String>, AppError> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| AppError::Database("Cursor is not positioned on a row".to_string()))?;
        row.try_get(column)
            .map(|value| value.map(str::to_string))
            .map_err(|e| map_pg_error("Failed to read column", e))
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}
