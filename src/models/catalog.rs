use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shape of a table registered in the local metastore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Metastore,
    View,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Metastore => "metastore",
            TableKind::View => "view",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "metastore" => Some(TableKind::Metastore),
            "view" => Some(TableKind::View),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTable {
    pub database: String,
    pub name: String,
    pub kind: TableKind,
    pub view_sql: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterTableRequest {
    #[serde(default = "default_database")]
    pub database: String,
    pub name: String,
    /// Registers a view instead of a physical table when present
    #[serde(default)]
    pub view_sql: Option<String>,
}

fn default_database() -> String {
    crate::models::relation::DEFAULT_DATABASE.to_string()
}
