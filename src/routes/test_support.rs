//! Helpers for driving the router in tests.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response};
use tower::ServiceExt;

use crate::services::session::SESSION_COOKIE_NAME;

/// `GET uri`, optionally carrying a `Cookie` header.
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// `session=<id>` pair from the response's `Set-Cookie` headers, if any.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&prefix))
        .last()
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get(LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_owned()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Value of query parameter `name` in an absolute URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Run the provider dance against a fake provider and return the
/// post-login session cookie.
pub async fn sign_in(app: &Router, cookie: Option<&str>) -> String {
    let resp = get(app, "/login/orcid", cookie).await;
    let cookie = cookie.map(str::to_owned).or_else(|| session_cookie(&resp)).expect("session cookie");
    let state = query_param(&location(&resp), "state").expect("state param");
    let resp = get(app, &format!("/login/orcid/authorized?code=abc&state={state}"), Some(&cookie)).await;
    assert_eq!(location(&resp), "/");
    session_cookie(&resp).expect("post-login session cookie")
}
