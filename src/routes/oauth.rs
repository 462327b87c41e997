//! Provider routes mounted at `/login/<provider>`.
//!
//! Success always lands on `/`; the landing route is what replays the
//! pending redirect target, so nothing here knows about app pages.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::redirect_to;
use crate::routes::session::session_cookie;
use crate::services::handoff::DEFAULT_VIEW;
use crate::services::oauth::{state_key, token_key};
use crate::services::session::{Session, SessionError, generate_token};
use crate::state::AppState;

/// `GET /login/<provider>`: store a CSRF state and go to the provider.
pub async fn authorize(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let oauth_state = generate_token();
    session.set(&state_key(state.provider.name()), oauth_state.as_str()).await?;
    Ok(redirect_to(&state.provider.authorize_url(&oauth_state)))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// `GET /login/<provider>/authorized`: check the state and trade the code
/// for a token kept in the session. The session id is replaced on success.
pub async fn authorized(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Query(params): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let provider = state.provider.name();
    let expected_state = session.pop(&state_key(provider)).await?;

    if let Some(error) = params.error {
        tracing::warn!(
            %provider,
            %error,
            description = params.error_description.as_deref().unwrap_or_default(),
            "provider denied authorization"
        );
        return Ok(redirect_to(DEFAULT_VIEW));
    }

    let Some(callback_state) = params.state.as_deref() else {
        return Ok((StatusCode::BAD_REQUEST, "missing oauth state").into_response());
    };
    if expected_state.as_deref() != Some(callback_state) {
        tracing::warn!(%provider, "oauth state mismatch");
        return Ok((StatusCode::UNAUTHORIZED, "invalid oauth state").into_response());
    }
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok((StatusCode::BAD_REQUEST, "missing authorization code").into_response());
    };

    let token = state.provider.exchange_code(code).await?;
    let key = token_key(provider);
    let raw = serde_json::to_string(&token).map_err(|e| SessionError::Corrupt { key: key.clone(), reason: e.to_string() })?;
    session.set(&key, raw).await?;
    let session = session.cycle_id().await?;

    tracing::info!(%provider, orcid = token.orcid.as_deref().unwrap_or_default(), "login complete");
    let jar = jar.add(session_cookie(session.id().to_owned(), &state.config));
    Ok((jar, redirect_to(DEFAULT_VIEW)).into_response())
}

#[cfg(test)]
#[path = "oauth_test.rs"]
mod tests;
