use serde::Serialize;
use std::fmt;

/// Placeholder substituted with the effective identity in a connection string
pub const USER_PLACEHOLDER: &str = "${user}";

/// Authentication mode applied to a live connection string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthMode {
    /// Cluster-mode secured access through a delegation token
    DelegationToken,
    /// Client-mode secured access with a kerberos principal
    Principal { principal: String },
    /// No authentication suffix
    Unsecured,
}

impl AuthMode {
    /// Connection-string suffix for this mode
    pub fn suffix(&self) -> String {
        match self {
            AuthMode::DelegationToken => ";auth=delegationToken".to_string(),
            AuthMode::Principal { principal } => format!(";principal={}", principal),
            AuthMode::Unsecured => String::new(),
        }
    }
}

/// Fully resolved connection string for the live SQL service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionEndpoint {
    url: String,
    auth: AuthMode,
}

impl ConnectionEndpoint {
    pub fn new(url: String, auth: AuthMode) -> Self {
        Self { url, auth }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn auth(&self) -> &AuthMode {
        &self.auth
    }

    /// Connection string with passwords masked for safe logging
    ///
    /// Covers both the URL userinfo and `password=` session variables.
    pub fn redacted(&self) -> String {
        let mut parts = self.url.split(';');
        let base = mask_userinfo(parts.next().unwrap_or_default());
        let variables = parts.map(|part| match part.split_once('=') {
            Some((key, _)) if key.trim().eq_ignore_ascii_case("password") => {
                format!("{}=***", key)
            }
            _ => part.to_string(),
        });

        std::iter::once(base)
            .chain(variables)
            .collect::<Vec<_>>()
            .join(";")
    }
}

fn mask_userinfo(base: &str) -> String {
    let (prefix, rest) = match base.strip_prefix("jdbc:") {
        Some(rest) => ("jdbc:", rest),
        None => ("", base),
    };
    match url::Url::parse(rest) {
        Ok(mut parsed) if parsed.password().is_some() => match parsed.set_password(Some("***")) {
            Ok(()) => format!("{}{}", prefix, parsed),
            Err(()) => "[invalid-url]".to_string(),
        },
        _ => base.to_string(),
    }
}

impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
