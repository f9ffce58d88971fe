use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{CommandClassification, NULL_TEXT};
use crate::services::backend::{ExecutionBackend, MetadataBackend};
use crate::services::connection_cache::ConnectionCache;
use crate::services::identity::IdentityResolver;
use crate::services::remote::{RemoteConnection, RowCursor};

/// Dispatches statements to the local backends or the live connection
pub struct CommandRouter {
    metadata: Arc<dyn MetadataBackend>,
    execution: Arc<dyn ExecutionBackend>,
    connections: ConnectionCache,
}

impl CommandRouter {
    pub fn new(
        metadata: Arc<dyn MetadataBackend>,
        execution: Arc<dyn ExecutionBackend>,
        connections: ConnectionCache,
    ) -> Self {
        Self {
            metadata,
            execution,
            connections,
        }
    }

    /// Execute one statement and return its result rows
    ///
    /// Function and macro DDL runs locally only. SET runs on the metadata
    /// backend and then the execution backend, whose rows are returned.
    /// SHOW queries return the first column of each live row. Anything else
    /// is sent to the live connection as an update and returns no rows.
    pub async fn execute(&mut self, statement: &str) -> Result<Vec<String>, AppError> {
        let classification = CommandClassification::classify(statement);
        tracing::debug!("Routing {} statement", classification.as_str());

        match classification {
            CommandClassification::FunctionOrMacroDdl => {
                self.execution.run_statement(statement).await
            }
            CommandClassification::SetStatement => {
                self.metadata.run_statement(statement).await?;
                self.execution.run_statement(statement).await
            }
            CommandClassification::ShowQuery => {
                let connection = self.connections.get_connection().await?;
                collect(connection.as_ref(), statement, first_column).await
            }
            CommandClassification::GenericStatement => {
                let connection = self.connections.get_connection().await?;
                connection.execute_update(statement).await?;
                Ok(Vec::new())
            }
        }
    }

    /// Run `sql` as a live query and return every row, columns tab-separated
    pub async fn scan(&mut self, sql: &str) -> Result<Vec<String>, AppError> {
        let connection = self.connections.get_connection().await?;
        collect(connection.as_ref(), sql, all_columns).await
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    /// Router over the same backends with its own, unopened connection
    pub fn derive(&self, identity: IdentityResolver) -> Self {
        Self::new(
            self.metadata.clone(),
            self.execution.clone(),
            self.connections.derive(identity),
        )
    }

    #[cfg(test)]
    pub(crate) async fn connection(&mut self) -> Result<Arc<dyn RemoteConnection>, AppError> {
        self.connections.get_connection().await
    }
}

type RowReader = fn(&dyn RowCursor) -> Result<String, AppError>;

/// Run `sql` as a query and read every row with `read`
///
/// The cursor is closed whether or not draining succeeds.
async fn collect(
    connection: &dyn RemoteConnection,
    sql: &str,
    read: RowReader,
) -> Result<Vec<String>, AppError> {
    let mut cursor = connection.execute_query(sql).await?;
    let drained = drain(cursor.as_mut(), read).await;
    let closed = cursor.close().await;

    let rows = drained?;
    closed?;
    Ok(rows)
}

async fn drain(cursor: &mut dyn RowCursor, read: RowReader) -> Result<Vec<String>, AppError> {
    let mut rows = Vec::new();
    while cursor.next().await? {
        rows.push(read(cursor)?);
    }
    Ok(rows)
}

fn text(value: Option<String>) -> String {
    value.unwrap_or_else(|| NULL_TEXT.to_string())
}

fn first_column(cursor: &dyn RowCursor) -> Result<String, AppError> {
    cursor.get_string(0).map(text)
}

fn all_columns(cursor: &dyn RowCursor) -> Result<String, AppError> {
    let values = (0..cursor.column_count())
        .map(|column| cursor.get_string(column).map(text))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values.join("\t"))
}
