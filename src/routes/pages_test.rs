use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::http::StatusCode;

use super::*;
use crate::routes::app;
use crate::routes::test_support::{body_text, get, location, session_cookie, sign_in};
use crate::state::test_helpers::{FailingStore, FakeProvider, test_app_state, test_app_state_with_store};

fn test_app_named(name: &str) -> Router {
    app(test_app_state(Arc::new(FakeProvider::named(name))))
}

// =============================================================================
// escape_html
// =============================================================================

#[test]
fn escape_html_replaces_markup() {
    assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
    assert_eq!(escape_html("plain"), "plain");
}

// =============================================================================
// GET /
// =============================================================================

#[tokio::test]
async fn home_unauthenticated_prompts_login() {
    let resp = get(&test_app_named("Ada"), "/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "<a href='/login'>Log in with orcid</a>");
}

#[tokio::test]
async fn home_escapes_display_name() {
    let app = test_app_named("<script>x</script>");
    let cookie = sign_in(&app, None).await;
    let resp = get(&app, "/", Some(&cookie)).await;
    assert_eq!(body_text(resp).await, "Hello, &lt;script&gt;x&lt;/script&gt;. You're on the home page!");
}

// =============================================================================
// GET /login
// =============================================================================

#[tokio::test]
async fn login_unauthenticated_enters_provider_flow_and_parks_target() {
    let app = test_app_named("Ada");
    let resp = get(&app, "/login?next_url=%2Fsomewhere%3Fa%3D1", None).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/login/orcid");

    let cookie = session_cookie(&resp).unwrap();
    let cookie = sign_in(&app, Some(&cookie)).await;
    let resp = get(&app, "/", Some(&cookie)).await;
    assert_eq!(location(&resp), "/somewhere?a=1");
}

#[tokio::test]
async fn login_without_next_url_returns_to_home() {
    let app = test_app_named("Ada");
    let cookie = session_cookie(&get(&app, "/login", None).await).unwrap();
    let cookie = sign_in(&app, Some(&cookie)).await;

    let resp = get(&app, "/", Some(&cookie)).await;
    assert_eq!(location(&resp), "/");
    let resp = get(&app, "/", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_with_empty_next_url_defaults_to_home() {
    let app = test_app_named("Ada");
    let cookie = session_cookie(&get(&app, "/login?next_url=", None).await).unwrap();
    let cookie = sign_in(&app, Some(&cookie)).await;
    assert_eq!(location(&get(&app, "/", Some(&cookie)).await), "/");
}

#[tokio::test]
async fn login_when_authenticated_skips_the_dance() {
    let app = test_app_named("Ada");
    let cookie = sign_in(&app, None).await;

    let resp = get(&app, "/login?next_url=/page-1", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/page-1");

    // Nothing was parked, so the landing route greets instead of redirecting.
    let resp = get(&app, "/", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn repeated_login_overwrites_pending_target() {
    let app = test_app_named("Ada");
    let cookie = session_cookie(&get(&app, "/login?next_url=/first", None).await).unwrap();
    get(&app, "/login?next_url=/second", Some(&cookie)).await;
    let cookie = sign_in(&app, Some(&cookie)).await;
    assert_eq!(location(&get(&app, "/", Some(&cookie)).await), "/second");
}

// =============================================================================
// GET /logout
// =============================================================================

#[tokio::test]
async fn logout_forgets_identity_and_expires_cookie() {
    let app = test_app_named("Ada");
    let cookie = sign_in(&app, None).await;

    let resp = get(&app, "/logout", Some(&cookie)).await;
    assert_eq!(location(&resp), "/");
    assert_eq!(session_cookie(&resp).as_deref(), Some("session="));

    let resp = get(&app, "/page-1", Some(&cookie)).await;
    assert_eq!(location(&resp), "/login/orcid");
}

#[tokio::test]
async fn logout_without_cookie_sends_only_the_expired_cookie() {
    let resp = get(&test_app_named("Ada"), "/logout", None).await;
    assert_eq!(location(&resp), "/");
    let sessions: Vec<_> = resp
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with("session="))
        .collect();
    assert_eq!(sessions.len(), 1, "cookies were: {sessions:?}");
    assert!(sessions[0].starts_with("session=;"), "cookie was: {}", sessions[0]);
    assert!(sessions[0].contains("Max-Age=0"), "cookie was: {}", sessions[0]);
}

// =============================================================================
// session store failures
// =============================================================================

#[tokio::test]
async fn unavailable_store_is_a_single_attempt_500() {
    for uri in ["/login?next_url=/page-1", "/", "/page-1"] {
        let store = Arc::new(FailingStore::default());
        let state = test_app_state_with_store(store.clone(), Arc::new(FakeProvider::named("Ada")));
        let resp = get(&app(state), uri, None).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "uri {uri}");
        assert_eq!(body_text(resp).await, "Internal Server Error", "uri {uri}");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1, "uri {uri}");
    }
}
