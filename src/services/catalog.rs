// Catalog rewriting
//
// Table lookups are resolved by the host catalog first; physical metastore
// tables are then replaced by a relation backed by the live connection.

use async_trait::async_trait;
use datafusion::arrow::datatypes::SchemaRef;
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{LogicalRelation, RemoteRelation, ResolvedSource, TableIdentifier};
use crate::services::conf::SqlConf;
use crate::services::endpoint::EndpointResolver;
use crate::services::identity::IdentityResolver;

/// Source type naming the live connection connector
pub const REMOTE_SOURCE_TYPE: &str = "jdbc";
pub const TABLE_OPTION: &str = "table";
pub const URL_OPTION: &str = "url";

/// Native table resolution of the host catalog
#[async_trait]
pub trait HostCatalog: Send + Sync {
    async fn lookup_relation(
        &self,
        table: &TableIdentifier,
        alias: Option<&str>,
    ) -> Result<LogicalRelation, AppError>;
}

/// Pluggable external data-source loading
#[async_trait]
pub trait DataSourceResolver: Send + Sync {
    async fn resolve(
        &self,
        explicit_schema: Option<SchemaRef>,
        partition_columns: &[String],
        source_type: &str,
        options: HashMap<String, String>,
    ) -> Result<ResolvedSource, AppError>;
}

/// Resolver for the `jdbc` source type
#[derive(Debug, Default, Clone)]
pub struct JdbcSourceResolver;

#[async_trait]
impl DataSourceResolver for JdbcSourceResolver {
    async fn resolve(
        &self,
        _explicit_schema: Option<SchemaRef>,
        partition_columns: &[String],
        source_type: &str,
        mut options: HashMap<String, String>,
    ) -> Result<ResolvedSource, AppError> {
        if source_type != REMOTE_SOURCE_TYPE {
            return Err(AppError::NotFound(format!(
                "Failed to find data source: {}",
                source_type
            )));
        }
        if !partition_columns.is_empty() {
            return Err(AppError::Validation(
                "The jdbc source does not support partition columns".to_string(),
            ));
        }

        let mut required = |key: &str| {
            options.remove(key).ok_or_else(|| {
                AppError::Validation(format!("Option '{}' is required for the jdbc source", key))
            })
        };
        let table = required(TABLE_OPTION)?;
        let url = required(URL_OPTION)?;

        Ok(ResolvedSource {
            relation: LogicalRelation::Remote(RemoteRelation {
                source: source_type.to_string(),
                table,
                url,
            }),
        })
    }
}

/// Substitutes live-connection relations for metastore tables
#[derive(Clone)]
pub struct CatalogRewriter {
    catalog: Arc<dyn HostCatalog>,
    sources: Arc<dyn DataSourceResolver>,
}

impl CatalogRewriter {
    pub fn new(catalog: Arc<dyn HostCatalog>, sources: Arc<dyn DataSourceResolver>) -> Self {
        Self { catalog, sources }
    }

    /// Resolve `table` and rewrite it onto the live connection
    ///
    /// The result is always wrapped in a subquery named after the bare table;
    /// a requested alias adds a second wrapper around that one. Nothing is
    /// cached, so every call re-resolves the endpoint.
    pub async fn lookup(
        &self,
        table: &TableIdentifier,
        alias: Option<&str>,
        conf: &SqlConf,
        identity: &IdentityResolver,
    ) -> Result<LogicalRelation, AppError> {
        let relation = match self.catalog.lookup_relation(table, alias).await? {
            LogicalRelation::Metastore(relation) => relation,
            other => {
                return Err(AppError::UnexpectedRelationKind(format!(
                    "{} resolved to a {} relation; only metastore tables can be served live",
                    table,
                    other.kind()
                )))
            }
        };

        let qualified_table = relation.qualified_name();
        let endpoint = EndpointResolver::resolve(conf, identity)?;

        let options = HashMap::from([
            (TABLE_OPTION.to_string(), qualified_table.clone()),
            (URL_OPTION.to_string(), endpoint.url().to_string()),
        ]);
        let resolved = self
            .sources
            .resolve(None, &[], REMOTE_SOURCE_TYPE, options)
            .await?;

        tracing::debug!(
            "Rewrote {} onto live endpoint {}",
            qualified_table,
            endpoint.redacted()
        );

        let bare = LogicalRelation::subquery(table.table.clone(), resolved.relation);
        Ok(match alias {
            Some(alias) => LogicalRelation::subquery(alias, bare),
            None => bare,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetastoreRelation;
    use crate::services::conf::{CREDENTIALS_ENABLED_KEY, JDBC_URL_KEY};
    use parking_lot::Mutex;

    struct FixedCatalog {
        relation: LogicalRelation,
        calls: Mutex<Vec<(TableIdentifier, Option<String>)>>,
    }

    impl FixedCatalog {
        fn new(relation: LogicalRelation) -> Arc<Self> {
            Arc::new(Self {
                relation,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HostCatalog for FixedCatalog {
        async fn lookup_relation(
            &self,
            table: &TableIdentifier,
            alias: Option<&str>,
        ) -> Result<LogicalRelation, AppError> {
            self.calls
                .lock()
                .push((table.clone(), alias.map(str::to_string)));
            Ok(self.relation.clone())
        }
    }

    fn orders() -> LogicalRelation {
        LogicalRelation::Metastore(MetastoreRelation {
            database: "sales".to_string(),
            table: "orders".to_string(),
            alias: None,
        })
    }

    fn conf() -> SqlConf {
        SqlConf::from_pairs([(JDBC_URL_KEY, "jdbc:hive2://live:10000/default")])
    }

    fn nobody() -> Option<String> {
        None
    }

    fn identity() -> IdentityResolver {
        IdentityResolver::new(None).with_os_user(nobody)
    }

    fn remote(url: &str) -> LogicalRelation {
        LogicalRelation::Remote(RemoteRelation {
            source: REMOTE_SOURCE_TYPE.to_string(),
            table: "sales.orders".to_string(),
            url: url.to_string(),
        })
    }

    #[tokio::test]
    async fn test_lookup_without_alias() {
        let rewriter = CatalogRewriter::new(FixedCatalog::new(orders()), Arc::new(JdbcSourceResolver));
        let ident = TableIdentifier::new(Some("sales"), "orders");

        let relation = rewriter.lookup(&ident, None, &conf(), &identity()).await.unwrap();
        assert_eq!(
            relation,
            LogicalRelation::subquery("orders", remote("jdbc:hive2://live:10000/default"))
        );
    }

    #[tokio::test]
    async fn test_lookup_with_alias_keeps_both_wrappers() {
        let catalog = FixedCatalog::new(orders());
        let rewriter = CatalogRewriter::new(catalog.clone(), Arc::new(JdbcSourceResolver));
        let ident = TableIdentifier::new(Some("sales"), "orders");

        let relation = rewriter
            .lookup(&ident, Some("o"), &conf(), &identity())
            .await
            .unwrap();
        assert_eq!(
            relation,
            LogicalRelation::subquery(
                "o",
                LogicalRelation::subquery("orders", remote("jdbc:hive2://live:10000/default"))
            )
        );
        assert_eq!(catalog.calls.lock()[0].1.as_deref(), Some("o"));
    }

    #[tokio::test]
    async fn test_endpoint_is_not_cached_between_lookups() {
        let rewriter = CatalogRewriter::new(FixedCatalog::new(orders()), Arc::new(JdbcSourceResolver));
        let ident = TableIdentifier::new(Some("sales"), "orders");
        let conf = conf();

        rewriter.lookup(&ident, None, &conf, &identity()).await.unwrap();
        conf.set(CREDENTIALS_ENABLED_KEY, "true");
        let relation = rewriter.lookup(&ident, None, &conf, &identity()).await.unwrap();
        assert_eq!(
            relation,
            LogicalRelation::subquery(
                "orders",
                remote("jdbc:hive2://live:10000/default;auth=delegationToken")
            )
        );
    }

    #[tokio::test]
    async fn test_rejects_other_relation_kinds() {
        let view = LogicalRelation::View {
            database: "sales".to_string(),
            name: "recent_orders".to_string(),
            sql: "SELECT * FROM orders".to_string(),
        };
        let rewriter = CatalogRewriter::new(FixedCatalog::new(view), Arc::new(JdbcSourceResolver));
        let ident = TableIdentifier::new(Some("sales"), "recent_orders");

        let err = rewriter.lookup(&ident, None, &conf(), &identity()).await.unwrap_err();
        assert!(matches!(err, AppError::UnexpectedRelationKind(_)));
    }

    #[tokio::test]
    async fn test_missing_endpoint_configuration() {
        let rewriter = CatalogRewriter::new(FixedCatalog::new(orders()), Arc::new(JdbcSourceResolver));
        let ident = TableIdentifier::new(None, "orders");

        let err = rewriter
            .lookup(&ident, None, &SqlConf::new(), &identity())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_jdbc_resolver_validates_options() {
        let resolver = JdbcSourceResolver;
        let err = resolver
            .resolve(None, &[], "parquet", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let options = HashMap::from([(TABLE_OPTION.to_string(), "sales.orders".to_string())]);
        let err = resolver
            .resolve(None, &[], REMOTE_SOURCE_TYPE, options)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_remote_scan_sql() {
        let relation = RemoteRelation {
            source: REMOTE_SOURCE_TYPE.to_string(),
            table: "sales.orders".to_string(),
            url: "jdbc:hive2://live:10000/default".to_string(),
        };
        assert_eq!(relation.scan_sql(), "SELECT * FROM sales.orders");
    }
}
