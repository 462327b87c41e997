//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Three app routes (`/`, `/login`, `/page-1`) sit next to the provider
//! routes under `/login/<provider>`. Every request passes through the
//! session middleware first, so handlers can take a `Session` extractor.

pub mod oauth;
pub mod pages;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

use std::fmt::Write;

use axum::Router;
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let entry = state.auth_entry();

    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/page-1", get(pages::page_one))
        .route("/logout", get(pages::logout))
        .route(&entry, get(oauth::authorize))
        .route(&format!("{entry}/authorized"), get(oauth::authorized))
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn_with_state(state.clone(), session::attach_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 307 to `location`. Bytes that may not appear in a header are
/// percent-encoded so caller-supplied targets can never panic the handler.
pub(crate) fn redirect_to(location: &str) -> Response {
    let encoded = encode_location(location);
    match HeaderValue::from_str(&encoded) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, value)]).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "unencodable redirect location");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn encode_location(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_graphic() {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
