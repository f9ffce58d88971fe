// Local backends the command router delegates to
use crate::api::middleware::AppError;
use async_trait::async_trait;

/// Local service of record for schema and settings bookkeeping
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Run a statement, returning its output rows as strings
    async fn run_statement(&self, sql: &str) -> Result<Vec<String>, AppError>;
}

/// Local engine for statements that are not sent to the live connection
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Run a statement, returning its output rows as strings
    async fn run_statement(&self, sql: &str) -> Result<Vec<String>, AppError>;
}
