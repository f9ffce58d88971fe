use std::fmt;
use std::sync::Arc;

/// Environment variable holding the system-level default identity
pub const HIVE_USER_ENV: &str = "HIVE_USER";

/// Optional capability of a host context that knows who is running queries
pub trait HasIdentity: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// Identity capability backed by a fixed user name
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub String);

impl HasIdentity for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Determines the effective user embedded in live connection strings
///
/// Lookup order, each step only consulted when the previous one gave nothing:
/// the host capability, the configured system user, then the OS user.
#[derive(Clone)]
pub struct IdentityResolver {
    capability: Option<Arc<dyn HasIdentity>>,
    system_user: Option<String>,
    os_user: fn() -> Option<String>,
}

impl IdentityResolver {
    pub fn new(capability: Option<Arc<dyn HasIdentity>>) -> Self {
        Self {
            capability,
            system_user: None,
            os_user: process_user,
        }
    }

    /// Configured system-level identity (`HIVE_USER`)
    pub fn with_system_user(mut self, user: Option<String>) -> Self {
        self.system_user = user;
        self
    }

    /// Replace the OS-user lookup
    #[cfg(test)]
    pub(crate) fn with_os_user(mut self, lookup: fn() -> Option<String>) -> Self {
        self.os_user = lookup;
        self
    }

    /// Same fallbacks with a different host capability
    pub fn with_capability(&self, capability: Option<Arc<dyn HasIdentity>>) -> Self {
        Self {
            capability,
            system_user: self.system_user.clone(),
            os_user: self.os_user,
        }
    }

    pub fn has_capability(&self) -> bool {
        self.capability.is_some()
    }

    pub fn resolve_user(&self) -> Option<String> {
        self.capability
            .as_ref()
            .and_then(|capability| non_empty(capability.current_user()))
            .or_else(|| non_empty(self.system_user.clone()))
            .or_else(|| non_empty((self.os_user)()))
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("has_capability", &self.has_capability())
            .field("system_user", &self.system_user)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Identity of the process owner
pub fn process_user() -> Option<String> {
    std::env::var(HIVE_USER_ENV)
        .ok()
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn no_os_user() -> Option<String> {
        None
    }

    fn os_bob() -> Option<String> {
        Some("bob".to_string())
    }

    struct CountingIdentity {
        user: Option<String>,
        calls: AtomicUsize,
    }

    impl HasIdentity for CountingIdentity {
        fn current_user(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.user.clone()
        }
    }

    #[test]
    fn test_capability_wins() {
        let resolver = IdentityResolver::new(Some(Arc::new(StaticIdentity("alice".to_string()))))
            .with_system_user(Some("hive".to_string()))
            .with_os_user(os_bob);
        assert_eq!(resolver.resolve_user().as_deref(), Some("alice"));
    }

    #[test]
    fn test_empty_capability_falls_back() {
        let capability = Arc::new(CountingIdentity {
            user: Some("  ".to_string()),
            calls: AtomicUsize::new(0),
        });
        let resolver = IdentityResolver::new(Some(capability.clone()))
            .with_system_user(Some("hive".to_string()))
            .with_os_user(os_bob);
        assert_eq!(resolver.resolve_user().as_deref(), Some("hive"));
        assert_eq!(capability.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_capability_uses_os_user() {
        let resolver = IdentityResolver::new(None).with_os_user(os_bob);
        assert!(!resolver.has_capability());
        assert_eq!(resolver.resolve_user().as_deref(), Some("bob"));
    }

    #[test]
    fn test_nothing_resolvable() {
        let resolver = IdentityResolver::new(None).with_os_user(no_os_user);
        assert_eq!(resolver.resolve_user(), None);
    }

    #[test]
    fn test_with_capability_keeps_fallbacks() {
        let base = IdentityResolver::new(None)
            .with_system_user(Some("hive".to_string()))
            .with_os_user(no_os_user);
        let derived = base.with_capability(Some(Arc::new(StaticIdentity("carol".to_string()))));
        assert_eq!(derived.resolve_user().as_deref(), Some("carol"));
        assert_eq!(base.resolve_user().as_deref(), Some("hive"));
    }
}
