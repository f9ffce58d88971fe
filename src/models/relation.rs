use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::middleware::AppError;

/// Database used when a table identifier is not qualified
pub const DEFAULT_DATABASE: &str = "default";

/// Possibly-qualified table name as written in a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    pub database: Option<String>,
    pub table: String,
}

impl TableIdentifier {
    pub fn new(database: Option<&str>, table: &str) -> Self {
        Self {
            database: database.map(str::to_string),
            table: table.to_string(),
        }
    }

    /// Parse `table` or `database.table`
    pub fn parse(name: &str) -> Result<Self, AppError> {
        let parts: Vec<&str> = name.trim().split('.').map(str::trim).collect();
        match parts.as_slice() {
            [table] if !table.is_empty() => Ok(Self::new(None, table)),
            [database, table] if !database.is_empty() && !table.is_empty() => {
                Ok(Self::new(Some(database), table))
            }
            _ => Err(AppError::Validation(format!(
                "Invalid table identifier '{}'. Expected 'table' or 'database.table'",
                name
            ))),
        }
    }

    /// Database this identifier resolves in
    pub fn database_or_default(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(database) => write!(f, "{}.{}", database, self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// Physical table stored in the metastore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetastoreRelation {
    pub database: String,
    pub table: String,
    pub alias: Option<String>,
}

impl MetastoreRelation {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

/// Relation whose rows live behind the live SQL connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRelation {
    /// Data source type that produced this relation
    pub source: String,
    /// `database.table` on the remote side
    pub table: String,
    /// Connection string used to reach the table
    pub url: String,
}

impl RemoteRelation {
    /// Statement that reads this relation through the remote connection
    pub fn scan_sql(&self) -> String {
        format!("SELECT * FROM {}", self.table)
    }
}

/// Closed set of relation shapes the host catalog can produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicalRelation {
    Metastore(MetastoreRelation),
    View {
        database: String,
        name: String,
        sql: String,
    },
    Remote(RemoteRelation),
    /// Naming wrapper around a child relation
    Subquery {
        alias: String,
        child: Box<LogicalRelation>,
    },
}

impl LogicalRelation {
    pub fn subquery(alias: impl Into<String>, child: LogicalRelation) -> Self {
        LogicalRelation::Subquery {
            alias: alias.into(),
            child: Box::new(child),
        }
    }

    /// Remote relation at the bottom of any subquery wrappers
    pub fn remote_leaf(&self) -> Option<&RemoteRelation> {
        match self {
            LogicalRelation::Remote(remote) => Some(remote),
            LogicalRelation::Subquery { child, .. } => child.remote_leaf(),
            _ => None,
        }
    }

    /// Short shape name used in error messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            LogicalRelation::Metastore(_) => "metastore",
            LogicalRelation::View { .. } => "view",
            LogicalRelation::Remote(_) => "remote",
            LogicalRelation::Subquery { .. } => "subquery",
        }
    }
}

/// Output of the external data-source resolution mechanism
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub relation: LogicalRelation,
}
