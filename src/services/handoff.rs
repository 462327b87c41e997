//! Deferred-redirect handoff.
//!
//! DESIGN
//! ======
//! The provider always returns to the fixed landing route, so the page the
//! user actually wanted is parked in the session under `next_url` before
//! the dance starts and replayed by the landing route afterwards.
//!
//! Per session the pending target is either EMPTY or PENDING(d):
//! - `request_login(d)` while unauthenticated: EMPTY/PENDING -> PENDING(d)
//!   (last write wins)
//! - `landing()`: PENDING(d) -> EMPTY and redirect to `d`;
//!   EMPTY -> EMPTY and render default content
//!
//! These functions decide; the route layer turns decisions into responses.

use crate::services::oauth::Identity;
use crate::services::session::{Session, SessionError};

/// Session key holding the pending redirect target.
pub const NEXT_URL_KEY: &str = "next_url";

/// Default view used when no destination is supplied.
pub const DEFAULT_VIEW: &str = "/";

/// Outcome of the landing route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Landing {
    /// A pending target was consumed; redirect there.
    Resume(String),
    /// Nobody is logged in; offer the login link.
    Prompt,
    /// Logged in with nothing pending; greet by display name.
    Greet(String),
}

/// Outcome of a protected page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protected {
    /// Not logged in; redirect into the auth flow.
    Redirect(String),
    /// Logged in; render for this display name.
    Render(String),
}

/// Resolve the destination, defaulting absent or empty input to [`DEFAULT_VIEW`].
#[must_use]
pub fn destination_or_default(next_url: Option<&str>) -> &str {
    match next_url {
        Some(d) if !d.is_empty() => d,
        _ => DEFAULT_VIEW,
    }
}

/// Park `next_url` and return where to redirect.
///
/// Already authenticated: the destination itself, and the session is not
/// touched. Otherwise the destination is stored (overwriting any previous
/// target) and the caller is sent to `auth_entry`.
///
/// # Errors
///
/// Propagates session store failures.
pub async fn request_login(
    session: &Session,
    identity: &Identity,
    next_url: Option<&str>,
    auth_entry: &str,
) -> Result<String, SessionError> {
    let destination = destination_or_default(next_url);
    if identity.is_authenticated() {
        return Ok(destination.to_owned());
    }

    session.set(NEXT_URL_KEY, destination).await?;
    tracing::debug!(session = %short_id(session), %destination, "pending redirect stored");
    Ok(auth_entry.to_owned())
}

/// Consume the pending target, if any, and decide what the landing route shows.
///
/// # Errors
///
/// Propagates session store failures.
pub async fn landing(session: &Session, identity: &Identity) -> Result<Landing, SessionError> {
    if let Some(next_url) = session.pop(NEXT_URL_KEY).await? {
        tracing::debug!(session = %short_id(session), %next_url, "pending redirect consumed");
        return Ok(Landing::Resume(next_url));
    }

    if identity.is_authenticated() {
        Ok(Landing::Greet(identity.display_name().to_owned()))
    } else {
        Ok(Landing::Prompt)
    }
}

/// Gate a protected page whose own URL is `resource_url` (path plus query).
///
/// # Errors
///
/// Propagates session store failures.
pub async fn access_protected_resource(
    session: &Session,
    identity: &Identity,
    resource_url: &str,
    auth_entry: &str,
) -> Result<Protected, SessionError> {
    if identity.is_authenticated() {
        return Ok(Protected::Render(identity.display_name().to_owned()));
    }
    let location = request_login(session, identity, Some(resource_url), auth_entry).await?;
    Ok(Protected::Redirect(location))
}

fn short_id(session: &Session) -> &str {
    session.id().get(..8).unwrap_or(session.id())
}

#[cfg(test)]
#[path = "handoff_test.rs"]
mod tests;
