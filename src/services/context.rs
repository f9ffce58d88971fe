// Live SQL context
//
// Ties the routing pieces together for one session: a settings registry, an
// identity, a command router with its own connection cache, and catalog
// rewriting for table lookups.

use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::{ConnectionEndpoint, LogicalRelation, TableIdentifier};
use crate::services::backend::{ExecutionBackend, MetadataBackend};
use crate::services::catalog::{CatalogRewriter, DataSourceResolver, HostCatalog, JdbcSourceResolver};
use crate::services::conf::SqlConf;
use crate::services::connection_cache::ConnectionCache;
use crate::services::datafusion::{DataFusionExecutionBackend, DataFusionSessionManager};
use crate::services::endpoint::EndpointResolver;
use crate::services::identity::{HasIdentity, IdentityResolver};
use crate::services::remote::{PgWireConnector, RemoteConnector};
use crate::services::router::CommandRouter;
use crate::storage::SqliteStorage;

pub struct LiveSqlContext {
    conf: SqlConf,
    identity: IdentityResolver,
    router: CommandRouter,
    rewriter: CatalogRewriter,
}

impl LiveSqlContext {
    pub fn builder() -> LiveSqlContextBuilder {
        LiveSqlContextBuilder::new()
    }

    /// Root context over the SQLite metastore, DataFusion and the PgWire driver
    pub fn from_config(config: &Config, storage: Arc<SqliteStorage>) -> Result<Self, AppError> {
        let conf = config.sql_conf();
        let execution = DataFusionExecutionBackend::with_manager(
            &DataFusionSessionManager::default_config(),
            conf.clone(),
        );
        let identity =
            IdentityResolver::new(None).with_system_user(config.live.hive_user.clone());

        Self::builder()
            .with_conf(conf)
            .with_identity(identity)
            .with_metadata(storage.clone())
            .with_catalog(storage)
            .with_execution(Arc::new(execution))
            .with_connector(Arc::new(PgWireConnector::new()))
            .build()
    }

    /// Execute a statement through the command router
    pub async fn sql(&mut self, statement: &str) -> Result<Vec<String>, AppError> {
        self.router.execute(statement).await
    }

    /// Resolve a table and rewrite it onto the live connection
    pub async fn lookup_relation(
        &self,
        table: &TableIdentifier,
        alias: Option<&str>,
    ) -> Result<LogicalRelation, AppError> {
        self.rewriter
            .lookup(table, alias, &self.conf, &self.identity)
            .await
    }

    /// Read every row of a table through the session's live connection
    pub async fn scan_relation(
        &mut self,
        table: &TableIdentifier,
        alias: Option<&str>,
    ) -> Result<Vec<String>, AppError> {
        let relation = self.lookup_relation(table, alias).await?;
        let remote = relation.remote_leaf().ok_or_else(|| {
            AppError::UnexpectedRelationKind(format!(
                "{} resolved to a {} relation",
                table,
                relation.kind()
            ))
        })?;
        let sql = remote.scan_sql();
        tracing::debug!("Scanning {} with {}", table, sql);
        self.router.scan(&sql).await
    }

    /// Endpoint a new connection would use right now
    pub fn endpoint(&self) -> Result<ConnectionEndpoint, AppError> {
        EndpointResolver::resolve(&self.conf, &self.identity)
    }

    pub fn conf(&self) -> &SqlConf {
        &self.conf
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn is_connected(&self) -> bool {
        self.router.is_connected()
    }

    /// Derived session sharing backends, catalog and settings
    ///
    /// The new context starts without a connection, even when this one
    /// already holds one.
    pub fn new_session(&self) -> Self {
        self.derive(self.identity.clone())
    }

    /// Derived session whose identity comes from `capability`
    pub fn new_session_with_identity(&self, capability: Option<Arc<dyn HasIdentity>>) -> Self {
        self.derive(self.identity.with_capability(capability))
    }

    fn derive(&self, identity: IdentityResolver) -> Self {
        Self {
            conf: self.conf.clone(),
            router: self.router.derive(identity.clone()),
            rewriter: self.rewriter.clone(),
            identity,
        }
    }

    #[cfg(test)]
    pub(crate) async fn connection(
        &mut self,
    ) -> Result<Arc<dyn crate::services::remote::RemoteConnection>, AppError> {
        self.router.connection().await
    }
}

/// Builder for LiveSqlContext
pub struct LiveSqlContextBuilder {
    conf: SqlConf,
    identity: IdentityResolver,
    metadata: Option<Arc<dyn MetadataBackend>>,
    execution: Option<Arc<dyn ExecutionBackend>>,
    connector: Option<Arc<dyn RemoteConnector>>,
    catalog: Option<Arc<dyn HostCatalog>>,
    sources: Arc<dyn DataSourceResolver>,
}

impl LiveSqlContextBuilder {
    pub fn new() -> Self {
        Self {
            conf: SqlConf::new(),
            identity: IdentityResolver::default(),
            metadata: None,
            execution: None,
            connector: None,
            catalog: None,
            sources: Arc::new(JdbcSourceResolver),
        }
    }

    pub fn with_conf(mut self, conf: SqlConf) -> Self {
        self.conf = conf;
        self
    }

    pub fn with_identity(mut self, identity: IdentityResolver) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataBackend>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_execution(mut self, execution: Arc<dyn ExecutionBackend>) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn RemoteConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn HostCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_sources(mut self, sources: Arc<dyn DataSourceResolver>) -> Self {
        self.sources = sources;
        self
    }

    pub fn build(self) -> Result<LiveSqlContext, AppError> {
        let missing = |what: &str| AppError::Internal(format!("{} is required", what));
        let metadata = self.metadata.ok_or_else(|| missing("Metadata backend"))?;
        let execution = self.execution.ok_or_else(|| missing("Execution backend"))?;
        let connector = self.connector.ok_or_else(|| missing("Remote connector"))?;
        let catalog = self.catalog.ok_or_else(|| missing("Host catalog"))?;

        let connections = ConnectionCache::new(connector, self.conf.clone(), self.identity.clone());
        Ok(LiveSqlContext {
            router: CommandRouter::new(metadata, execution, connections),
            rewriter: CatalogRewriter::new(catalog, self.sources),
            conf: self.conf,
            identity: self.identity,
        })
    }
}

impl Default for LiveSqlContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
