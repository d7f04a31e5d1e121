//! Route and store configuration shared by the guards and the session store.

/// Default storage key for the durable session snapshot.
pub const DEFAULT_STORAGE_KEY: &str = "auth-storage";

/// Paths the guards redirect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutesConfig {
    /// Login page; receives `?redirect=<path>`.
    pub login: String,
    /// Shown to authenticated users lacking a capability.
    pub forbidden: String,
    /// Default target for public-only pages.
    pub home: String,
    /// Admin area root; the admin guard sends anonymous users back here after login.
    pub admin: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            forbidden: "/forbidden".to_string(),
            home: "/".to_string(),
            admin: "/admin".to_string(),
        }
    }
}

impl RoutesConfig {
    /// Prefix every path with `base` (e.g. `/shop`). Empty base is a no-op.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let join = |path: &str| {
            if base.is_empty() {
                path.to_string()
            } else if path == "/" {
                format!("{base}/")
            } else {
                format!("{base}{path}")
            }
        };
        let defaults = Self::default();
        Self {
            login: join(&defaults.login),
            forbidden: join(&defaults.forbidden),
            home: join(&defaults.home),
            admin: join(&defaults.admin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_prefixes_paths() {
        let routes = RoutesConfig::with_base("/shop/");
        assert_eq!(routes.login, "/shop/login");
        assert_eq!(routes.forbidden, "/shop/forbidden");
        assert_eq!(routes.home, "/shop/");
        assert_eq!(routes.admin, "/shop/admin");
    }

    #[test]
    fn test_empty_base_keeps_defaults() {
        assert_eq!(RoutesConfig::with_base(""), RoutesConfig::default());
    }
}
