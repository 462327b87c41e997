//! OAuth2 provider client and the identity it yields.
//!
//! The provider is a collaborator behind `OAuthProvider`; the rest of the
//! app only ever asks the session for an `Identity`. The token record is
//! stored as JSON under `<provider>_oauth_token` and the in-flight CSRF
//! state under `<provider>_oauth_state`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::services::session::{Session, SessionError};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
}

// =============================================================================
// TOKEN + IDENTITY
// =============================================================================

/// Token response from the provider. ORCID adds `name` and `orcid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
}

/// What the rest of the app may know about the current user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
    display_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { display_name: None }
    }

    #[must_use]
    pub fn from_token(token: &OAuthToken) -> Self {
        let name = token
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(token.orcid.as_deref())
            .unwrap_or_default();
        Self { display_name: Some(name.to_owned()) }
    }

    /// Resolve the identity carried by `session` for `provider`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Corrupt` if the stored token is not valid JSON.
    pub async fn load(session: &Session, provider: &str) -> Result<Self, SessionError> {
        let key = token_key(provider);
        let Some(raw) = session.get(&key).await? else {
            return Ok(Self::anonymous());
        };
        let token: OAuthToken =
            serde_json::from_str(&raw).map_err(|e| SessionError::Corrupt { key, reason: e.to_string() })?;
        Ok(Self::from_token(&token))
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.display_name.is_some()
    }

    /// Display name; empty when not authenticated.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or_default()
    }
}

#[must_use]
pub fn token_key(provider: &str) -> String {
    format!("{provider}_oauth_token")
}

#[must_use]
pub fn state_key(provider: &str) -> String {
    format!("{provider}_oauth_state")
}

// =============================================================================
// PROVIDER
// =============================================================================

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Short name, used in session keys and the `/login/<name>` mount.
    fn name(&self) -> &str;

    /// Provider authorization page URL carrying `state`.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token.
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AuthError>;
}

/// ORCID (or any standard authorization-code provider with form-encoded token exchange).
pub struct OrcidProvider {
    config: ProviderConfig,
    authorize_url: Url,
    redirect_uri: String,
    http: reqwest::Client,
}

impl OrcidProvider {
    /// # Errors
    ///
    /// Returns an error if the authorize URL does not parse or the HTTP
    /// client cannot be built.
    pub fn new(config: ProviderConfig, redirect_uri: String) -> Result<Self, AuthError> {
        let authorize_url = Url::parse(&config.authorize_url)
            .map_err(|e| AuthError::InvalidConfig(format!("authorize url {}: {e}", config.authorize_url)))?;
        Url::parse(&config.token_url)
            .map_err(|e| AuthError::InvalidConfig(format!("token url {}: {e}", config.token_url)))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        Ok(Self { config, authorize_url, redirect_uri, http })
    }
}

#[async_trait]
impl OAuthProvider for OrcidProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn authorize_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scope)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, AuthError> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::TokenExchange(format!("{status}: {body}")));
        }
        serde_json::from_str(&body).map_err(|_| AuthError::TokenExchange(format!("unexpected response: {body}")))
    }
}

#[cfg(test)]
#[path = "oauth_test.rs"]
mod tests;
