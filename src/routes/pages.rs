//! Application pages.

use axum::extract::{OriginalUri, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::redirect_to;
use crate::routes::session::expired_session_cookie;
use crate::services::handoff::{self, DEFAULT_VIEW, Landing, Protected};
use crate::services::oauth::Identity;
use crate::services::session::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next_url: Option<String>,
}

/// `GET /login?next_url=...`: skip the dance if already logged in, otherwise
/// park `next_url` and enter the provider flow.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let identity = Identity::load(&session, state.provider.name()).await?;
    let location =
        handoff::request_login(&session, &identity, query.next_url.as_deref(), &state.auth_entry()).await?;
    Ok(redirect_to(&location))
}

/// `GET /`: the landing route the provider returns to.
pub async fn home(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let identity = Identity::load(&session, state.provider.name()).await?;
    let response = match handoff::landing(&session, &identity).await? {
        Landing::Resume(next_url) => redirect_to(&next_url),
        Landing::Prompt => Html(format!(
            "<a href='/login'>Log in with {}</a>",
            escape_html(state.provider.name())
        ))
        .into_response(),
        Landing::Greet(name) => {
            Html(format!("Hello, {}. You're on the home page!", escape_html(&name))).into_response()
        }
    };
    Ok(response)
}

/// `GET /page-1`: requires login; comes back here afterwards.
pub async fn page_one(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, AppError> {
    let identity = Identity::load(&session, state.provider.name()).await?;
    let resource_url = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());
    let response =
        match handoff::access_protected_resource(&session, &identity, resource_url, &state.auth_entry()).await? {
            Protected::Redirect(location) => redirect_to(&location),
            Protected::Render(name) => {
                Html(format!("Hello, {}. You're on an extra page!", escape_html(&name))).into_response()
            }
        };
    Ok(response)
}

/// `GET /logout`: forget the token and any pending target.
pub async fn logout(State(state): State<AppState>, session: Session, jar: CookieJar) -> Result<Response, AppError> {
    session.clear().await?;
    tracing::info!("session cleared");
    let jar = jar.add(expired_session_cookie(state.config.cookie_secure));
    Ok((jar, redirect_to(DEFAULT_VIEW)).into_response())
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
