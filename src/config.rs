//! Application configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! `AppConfig` is built once in `main` and handed to `AppState`; nothing
//! reads the environment after startup. Parsing goes through a lookup
//! closure so tests can feed a map instead of mutating process env.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8775;
pub const DEFAULT_PUBLIC_URL: &str = "https://localhost:8775";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
pub const DEFAULT_ORCID_BASE_URL: &str = "https://orcid.org";
pub const DEFAULT_ORCID_SCOPE: &str = "/authenticate";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

// =============================================================================
// CONFIG TYPES
// =============================================================================

/// OAuth2 client settings for the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Short provider name; also the `/login/<name>` mount point.
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub authorize_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base URL; the provider redirects back under it.
    pub public_url: String,
    pub provider: ProviderConfig,
    /// Idle lifetime of a session.
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Required:
    /// - `ORCID_CLIENT_ID`
    /// - `ORCID_CLIENT_SECRET`
    ///
    /// Optional:
    /// - `ORCID_BASE_URL`: default `https://orcid.org` (point at the sandbox for testing)
    /// - `ORCID_SCOPE`: default `/authenticate`
    /// - `HOST`, `PORT`: default `0.0.0.0:8775`
    /// - `PUBLIC_URL`: default `https://localhost:8775`
    /// - `SESSION_TTL_SECS`: default 86400
    /// - `COOKIE_SECURE`: inferred from the `PUBLIC_URL` scheme when unset
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = required(&lookup, "ORCID_CLIENT_ID")?;
        let client_secret = required(&lookup, "ORCID_CLIENT_SECRET")?;
        let base_url = lookup("ORCID_BASE_URL")
            .unwrap_or_else(|| DEFAULT_ORCID_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let scope = lookup("ORCID_SCOPE").unwrap_or_else(|| DEFAULT_ORCID_SCOPE.to_string());

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid { var: "PORT", reason: e.to_string() })?,
            None => DEFAULT_PORT,
        };
        let public_url = lookup("PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !public_url.starts_with("http://") && !public_url.starts_with("https://") {
            return Err(ConfigError::Invalid { var: "PUBLIC_URL", reason: format!("not an http(s) URL: {public_url}") });
        }

        let ttl_secs = match lookup("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid { var: "SESSION_TTL_SECS", reason: e.to_string() })?,
            None => DEFAULT_SESSION_TTL_SECS,
        };
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid { var: "SESSION_TTL_SECS", reason: "must be positive".into() });
        }

        let cookie_secure = lookup("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or_else(|| public_url.starts_with("https://"));

        let provider = ProviderConfig {
            name: "orcid".into(),
            client_id,
            client_secret,
            scope,
            authorize_url: format!("{base_url}/oauth/authorize"),
            token_url: format!("{base_url}/oauth/token"),
        };

        Ok(Self { host, port, public_url, provider, session_ttl: Duration::from_secs(ttl_secs), cookie_secure })
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Callback URL registered with the provider, e.g. `https://host/login/orcid/authorized`.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/login/{}/authorized", self.public_url, self.provider.name)
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { var })
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
