//! Server-side sessions keyed by an opaque cookie id.
//!
//! ARCHITECTURE
//! ============
//! The browser only ever holds a random 32-byte hex session id. All values
//! (the pending redirect target, the OAuth state and token) live in a
//! `SessionStore` behind `Arc<dyn ...>`, so handlers see sessions as an
//! explicit capability rather than ambient global state.
//!
//! TRADE-OFFS
//! ==========
//! `MemorySessionStore` loses everything on restart. `pop` runs under the
//! write lock so read-and-delete is atomic per store, but two concurrent
//! requests of one session racing on `pop` are not ordered: either may win.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const SESSION_COOKIE_NAME: &str = "session";
const SESSION_ID_HEX_LEN: usize = 64;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Whether a cookie value has the shape of an id minted by [`generate_token`].
#[must_use]
pub fn is_valid_session_id(raw: &str) -> bool {
    raw.len() == SESSION_ID_HEX_LEN && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("session value for {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

// =============================================================================
// STORE
// =============================================================================

/// Per-session string key/value storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError>;
    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError>;
    /// Read and delete `key` in one step.
    async fn pop(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError>;
    /// Drop every value of the session.
    async fn clear(&self, session_id: &str) -> Result<(), SessionError>;
    /// Move every value of `from` to the fresh id `to`; `from` stops existing.
    async fn rename(&self, from: &str, to: &str) -> Result<(), SessionError>;
    /// Remove idle sessions, returning how many were dropped.
    async fn purge_expired(&self) -> Result<usize, SessionError>;
}

struct SessionEntry {
    values: HashMap<String, String>,
    last_seen: Instant,
}

/// In-process store with an idle TTL.
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    /// Number of sessions currently held, expired or not.
    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.len()
    }

    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) >= self.ttl
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let Some(entry) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        if self.is_expired(entry, now) {
            sessions.remove(session_id);
            return Ok(None);
        }
        entry.last_seen = now;
        Ok(entry.values.get(key).cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let entry = sessions
            .entry(session_id.to_owned())
            .or_insert_with(|| SessionEntry { values: HashMap::new(), last_seen: now });
        if self.is_expired(entry, now) {
            entry.values.clear();
        }
        entry.last_seen = now;
        entry.values.insert(key.to_owned(), value);
        Ok(())
    }

    async fn pop(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let Some(entry) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        if self.is_expired(entry, now) {
            sessions.remove(session_id);
            return Ok(None);
        }
        entry.last_seen = now;
        Ok(entry.values.remove(key))
    }

    async fn clear(&self, session_id: &str) -> Result<(), SessionError> {
        self.inner.write().await.remove(session_id);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), SessionError> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let Some(mut entry) = sessions.remove(from) else {
            return Ok(());
        };
        if self.is_expired(&entry, now) {
            return Ok(());
        }
        entry.last_seen = now;
        sessions.insert(to.to_owned(), entry);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, SessionError> {
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        Ok(before - sessions.len())
    }
}

// =============================================================================
// SESSION HANDLE
// =============================================================================

/// Id assigned to the current request by the session middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// One user's session: the id plus the store it lives in.
#[derive(Clone)]
pub struct Session {
    id: String,
    store: Arc<dyn SessionStore>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        Self { id: id.into(), store }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.store.get(&self.id, key).await
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), SessionError> {
        self.store.set(&self.id, key, value.into()).await
    }

    pub async fn pop(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.store.pop(&self.id, key).await
    }

    pub async fn clear(&self) -> Result<(), SessionError> {
        self.store.clear(&self.id).await
    }

    /// Move this session's values under a freshly minted id and return the
    /// handle for it. The old id is left empty, so a cookie captured before
    /// login carries nothing afterwards.
    pub async fn cycle_id(&self) -> Result<Session, SessionError> {
        let fresh = generate_token();
        self.store.rename(&self.id, &fresh).await?;
        Ok(Self { id: fresh, store: Arc::clone(&self.store) })
    }
}

// =============================================================================
// REAPER
// =============================================================================

/// Periodically drop idle sessions for the lifetime of the process.
pub fn spawn_session_reaper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "session purge failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
