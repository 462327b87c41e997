mod config;
mod error;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use services::oauth::{OAuthProvider, OrcidProvider};
use services::session::{MemorySessionStore, SessionStore};

const SESSION_REAP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration invalid");
            std::process::exit(1);
        }
    };

    let provider: Arc<dyn OAuthProvider> =
        Arc::new(OrcidProvider::new(config.provider.clone(), config.redirect_uri())?);
    tracing::info!(provider = provider.name(), redirect_uri = %config.redirect_uri(), "oauth provider configured");

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(config.session_ttl));
    let _reaper = services::session::spawn_session_reaper(sessions.clone(), SESSION_REAP_INTERVAL);

    let bind_addr = config.bind_addr();
    let public_url = config.public_url.clone();
    let state = state::AppState::new(config, sessions, provider);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(%bind_addr, %public_url, "returnflow listening");
    axum::serve(listener, app).await?;
    Ok(())
}
