// Live connection abstraction
//
// The router only needs a blocking-style query/update interface from the
// remote driver. Each driver implements `RemoteConnector` and hands out
// `RemoteConnection` handles; query results are read through a `RowCursor`.

pub mod postgres;

pub use postgres::PgWireConnector;

use crate::api::middleware::AppError;
use crate::models::ConnectionEndpoint;
use async_trait::async_trait;
use std::sync::Arc;

/// Opens live connections for a resolved endpoint
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Open a new connection
    ///
    /// `user` is the effective identity at connect time. Drivers may ignore it
    /// when the endpoint already names a user.
    async fn connect(
        &self,
        endpoint: &ConnectionEndpoint,
        user: Option<&str>,
    ) -> Result<Arc<dyn RemoteConnection>, AppError>;
}

/// A single connection to the live SQL service
#[async_trait]
pub trait RemoteConnection: Send + Sync {
    /// Run a row-returning statement
    async fn execute_query(&self, sql: &str) -> Result<Box<dyn RowCursor>, AppError>;

    /// Run a DDL/DML statement, discarding any result
    async fn execute_update(&self, sql: &str) -> Result<(), AppError>;
}

/// Forward-only cursor over a query result
#[async_trait]
pub trait RowCursor: Send {
    /// Advance to the next row, returning false once exhausted
    async fn next(&mut self) -> Result<bool, AppError>;

    /// Number of columns in the current row, 0 when not positioned
    fn column_count(&self) -> usize;

    /// Text value of a column (0-based) in the current row
    fn get_string(&self, column: usize) -> Result<Option<String>, AppError>;

    /// Release the cursor
    async fn close(&mut self) -> Result<(), AppError>;
}
