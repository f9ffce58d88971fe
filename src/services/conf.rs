use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Base connection string of the live SQL service
pub const JDBC_URL_KEY: &str = "hiveserver2.jdbc.url";
/// Kerberos principal for client-mode secured clusters
pub const JDBC_PRINCIPAL_KEY: &str = "hiveserver2.jdbc.url.principal";
/// Selects delegation-token authentication
pub const CREDENTIALS_ENABLED_KEY: &str = "credentials.hiveserver2.enabled";

/// Shared key/value configuration registry
///
/// Cloning shares the underlying entries, so a SET applied through one
/// handle is visible to every context built from the same registry.
#[derive(Debug, Clone, Default)]
pub struct SqlConf {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl SqlConf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Parse a boolean entry, falling back to `default` when unset or unparseable
    pub fn get_boolean(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                other => {
                    tracing::warn!("Ignoring non-boolean value '{}' for {}", other, key);
                    default
                }
            },
            None => default,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// All entries, ordered by key
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
