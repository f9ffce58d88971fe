use crate::api::middleware::AppError;
use crate::models::{AuthMode, ConnectionEndpoint, USER_PLACEHOLDER};
use crate::services::conf::{SqlConf, CREDENTIALS_ENABLED_KEY, JDBC_PRINCIPAL_KEY, JDBC_URL_KEY};
use crate::services::identity::IdentityResolver;

/// Builds the live connection string from the current configuration
pub struct EndpointResolver;

impl EndpointResolver {
    /// Resolve the endpoint for the given configuration snapshot
    ///
    /// The delegation-token flag takes precedence over a configured principal.
    /// `${user}` is replaced by the effective identity, or removed when no
    /// identity can be found.
    pub fn resolve(conf: &SqlConf, identity: &IdentityResolver) -> Result<ConnectionEndpoint, AppError> {
        let base_url = conf.get(JDBC_URL_KEY).ok_or_else(|| {
            AppError::Configuration(format!("{} is not configured", JDBC_URL_KEY))
        })?;

        let auth = if conf.get_boolean(CREDENTIALS_ENABLED_KEY, false) {
            AuthMode::DelegationToken
        } else if let Some(principal) = conf.get(JDBC_PRINCIPAL_KEY) {
            AuthMode::Principal { principal }
        } else {
            AuthMode::Unsecured
        };

        let mut url = format!("{}{}", base_url, auth.suffix());
        if url.contains(USER_PLACEHOLDER) {
            let user = identity.resolve_user().unwrap_or_default();
            url = url.replace(USER_PLACEHOLDER, &user);
        }

        let endpoint = ConnectionEndpoint::new(url, auth);
        tracing::debug!("Resolved live endpoint: {}", endpoint.redacted());
        Ok(endpoint)
    }
}
