//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the redirect handoff, session storage, and the
//! provider client so route handlers can stay focused on HTTP translation.

pub mod handoff;
pub mod oauth;
pub mod session;
