use std::fmt;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::services::conf::SqlConf;
use crate::services::endpoint::EndpointResolver;
use crate::services::identity::IdentityResolver;
use crate::services::remote::{RemoteConnection, RemoteConnector};

/// Lazily opened live connection owned by a single context
///
/// The first `get_connection` resolves the endpoint and identity and
/// connects; later calls hand back the same handle. Access goes through
/// `&mut self`, so there is no first-call race to guard against; sharing one
/// cache between tasks would need a `tokio::sync::OnceCell` here instead.
pub struct ConnectionCache {
    connector: Arc<dyn RemoteConnector>,
    conf: SqlConf,
    identity: IdentityResolver,
    connection: Option<Arc<dyn RemoteConnection>>,
}

impl ConnectionCache {
    pub fn new(connector: Arc<dyn RemoteConnector>, conf: SqlConf, identity: IdentityResolver) -> Self {
        Self {
            connector,
            conf,
            identity,
            connection: None,
        }
    }

    pub async fn get_connection(&mut self) -> Result<Arc<dyn RemoteConnection>, AppError> {
        if let Some(connection) = &self.connection {
            tracing::debug!("Reusing cached live connection");
            return Ok(connection.clone());
        }

        let endpoint = EndpointResolver::resolve(&self.conf, &self.identity)?;
        let user = self.identity.resolve_user();
        tracing::info!("Opening live connection to {}", endpoint.redacted());

        let connection = self.connector.connect(&endpoint, user.as_deref()).await?;
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Empty cache for a derived session, sharing connector and configuration
    pub fn derive(&self, identity: IdentityResolver) -> Self {
        Self::new(self.connector.clone(), self.conf.clone(), identity)
    }
}

impl fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("connected", &self.is_connected())
            .finish()
    }
}
