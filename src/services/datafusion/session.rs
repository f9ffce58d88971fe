// DataFusion SessionManager
//
// Builds the SessionContext used by the local execution backend.

use datafusion::prelude::*;

/// Configuration for DataFusion sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Batch size for query execution
    pub batch_size: usize,
    /// Number of partitions for parallel execution
    pub target_partitions: usize,
    /// Expose `information_schema` tables
    pub information_schema: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            information_schema: true,
        }
    }
}

/// Creates configured DataFusion sessions
///
/// # Example
/// ```rust,ignore
/// let manager = DataFusionSessionManager::new(SessionConfig::default());
/// let ctx = manager.create_session();
/// let df = ctx.sql("SELECT 1").await?;
/// ```
pub struct DataFusionSessionManager {
    config: SessionConfig,
}

impl DataFusionSessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn default_config() -> Self {
        Self::new(SessionConfig::default())
    }

    /// Create a new SessionContext from the manager's configuration
    pub fn create_session(&self) -> SessionContext {
        let config = datafusion::prelude::SessionConfig::new()
            .with_batch_size(self.config.batch_size)
            .with_target_partitions(self.config.target_partitions)
            .with_information_schema(self.config.information_schema);

        SessionContext::new_with_config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.batch_size, 8192);
        assert!(config.target_partitions >= 1);
        assert!(config.information_schema);
    }

    #[test]
    fn test_session_uses_configured_batch_size() {
        let manager = DataFusionSessionManager::new(SessionConfig {
            batch_size: 256,
            target_partitions: 2,
            information_schema: false,
        });
        let ctx = manager.create_session();
        assert_eq!(ctx.copied_config().batch_size(), 256);
        assert_eq!(ctx.copied_config().target_partitions(), 2);
    }
}
