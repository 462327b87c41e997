//! Session cookie middleware and the `Session` extractor.

use axum::extract::{FromRef, Request, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::session::{
    SESSION_COOKIE_NAME, Session, SessionError, SessionId, generate_token, is_valid_session_id,
};
use crate::state::AppState;

/// Assign a session id to every request, minting one when the browser sent
/// none or a malformed one. The cookie is (re)issued on every response so its
/// `Max-Age` tracks the store's idle TTL, unless the handler already set one.
pub async fn attach_session(State(state): State<AppState>, jar: CookieJar, mut request: Request, next: Next) -> Response {
    let id = jar
        .get(SESSION_COOKIE_NAME)
        .map(Cookie::value)
        .filter(|v| is_valid_session_id(v))
        .map_or_else(generate_token, str::to_owned);

    request.extensions_mut().insert(SessionId(id.clone()));
    let response = next.run(request).await;
    if sets_session_cookie(&response) {
        return response;
    }
    (jar.add(session_cookie(id, &state.config)), response).into_response()
}

/// Session cookie carrying `id`, alive for one idle TTL.
pub(crate) fn session_cookie(id: String, config: &AppConfig) -> Cookie<'static> {
    let max_age = i64::try_from(config.session_ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE_NAME, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::seconds(max_age))
        .build()
}

fn sets_session_cookie(response: &Response) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v).ok())
        .any(|c| c.name() == SESSION_COOKIE_NAME)
}

/// Expired session cookie, sent on logout so the next request mints a new id.
pub(crate) fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

impl<S> axum::extract::FromRequestParts<S> for Session
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(SessionId(id)) = parts.extensions.get::<SessionId>().cloned() else {
            return Err(SessionError::Unavailable("no session id on request".into()).into());
        };
        let app_state = AppState::from_ref(state);
        Ok(Session::new(id, app_state.sessions))
    }
}
