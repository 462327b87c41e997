//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It is built once in `main` from an explicit `AppConfig`; there is no
//! process-wide mutable singleton.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::oauth::OAuthProvider;
use crate::services::session::SessionStore;

/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub provider: Arc<dyn OAuthProvider>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, sessions: Arc<dyn SessionStore>, provider: Arc<dyn OAuthProvider>) -> Self {
        Self { config: Arc::new(config), sessions, provider }
    }

    /// Entry point of the provider's authorization dance, e.g. `/login/orcid`.
    #[must_use]
    pub fn auth_entry(&self) -> String {
        format!("/login/{}", self.provider.name())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_entry_uses_provider_name() {
        let state = test_helpers::test_app_state(Arc::new(test_helpers::FakeProvider::named("Ada")));
        assert_eq!(state.auth_entry(), "/login/orcid");
    }
}
