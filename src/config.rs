/// Environment-driven application configuration
use std::time::Duration;

/// OAuth client identifier issued by the provider
pub const CLIENT_ID_VAR: &str = "CLIENT_ID";

/// Client secret for the Basic auth token exchange
pub const CLIENT_SECRET_VAR: &str = "CLIENT_SECRET";

/// Lifetime of a pending authorization session, in seconds
pub const SESSION_TTL_VAR: &str = "PKCE_SESSION_TTL_SECS";

/// Default window for completing an authorization flow
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Not validated; an unset value is carried through as absent.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    ///
    /// # Examples
    ///
    /// ```
    /// use farbe::config::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|key| match key {
    ///     "CLIENT_ID" => Some("abc".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.client_id.as_deref(), Some("abc"));
    /// assert!(config.client_secret.is_none());
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let session_ttl = match lookup(SESSION_TTL_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(
                        value = %raw,
                        "ignoring invalid {SESSION_TTL_VAR}, using default"
                    );
                    DEFAULT_SESSION_TTL
                }
            },
            None => DEFAULT_SESSION_TTL,
        };

        let client_id = lookup(CLIENT_ID_VAR);
        if client_id.is_none() {
            tracing::debug!("{CLIENT_ID_VAR} is not set");
        }

        Self {
            client_id,
            client_secret: lookup(CLIENT_SECRET_VAR),
            session_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_all_values_present() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CLIENT_ID", "client-123"),
            ("CLIENT_SECRET", "secret"),
            ("PKCE_SESSION_TTL_SECS", "120"),
        ]));

        assert_eq!(config.client_id.as_deref(), Some("client-123"));
        assert_eq!(config.client_secret.as_deref(), Some("secret"));
        assert_eq!(config.session_ttl, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_client_id_is_not_an_error() {
        let config = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_ttl_falls_back() {
        for raw in ["soon", "0", "-5", ""] {
            let config = AppConfig::from_lookup(lookup_from(&[("PKCE_SESSION_TTL_SECS", raw)]));
            assert_eq!(config.session_ttl, DEFAULT_SESSION_TTL);
        }
    }

    #[test]
    fn test_ttl_is_trimmed() {
        let config = AppConfig::from_lookup(lookup_from(&[("PKCE_SESSION_TTL_SECS", " 90 ")]));
        assert_eq!(config.session_ttl, Duration::from_secs(90));
    }
}
