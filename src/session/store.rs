//! In-memory session store.
//!
//! Maps session IDs to their identity contexts with:
//! - TTL-based expiry
//! - Bounded size with least-recently-accessed eviction
//! - Serialized validation per session

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use super::types::{Session, SessionId};
use crate::identity::{CredentialValidator, IdentityContext, OidcCredential, ValidationResult};
use crate::oidc::{OidcConfig, TokenValidator, UserInfoClient};

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10000;

/// Session store keeping one [`IdentityContext`] per session.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,

    /// Default session TTL in seconds.
    default_ttl_secs: u64,

    max_sessions: usize,
}

impl SessionStore {
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_ttl_secs,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Limit the number of live sessions; the least recently accessed is evicted first.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Create an unauthenticated session.
    pub fn create(&self) -> Result<SessionId> {
        let session = Session::new(self.default_ttl_secs);
        let id = session.id;

        let evicted = {
            let mut sessions = self.write()?;
            let evicted = if sessions.len() >= self.max_sessions {
                evict_lru(&mut sessions)
            } else {
                None
            };
            sessions.insert(id, session);
            evicted
        };

        if let Some(session) = evicted {
            debug!(session = %session.id, "Session store full, evicted least recently used session");
            invalidate_context(&session)?;
        }

        debug!(session = %id, ttl_secs = self.default_ttl_secs, "Session created");
        Ok(id)
    }

    /// Identity context of a live session, updating its last access time.
    pub fn context(&self, id: SessionId) -> Result<Option<Arc<Mutex<IdentityContext>>>> {
        let mut sessions = self.write()?;
        match sessions.get_mut(&id) {
            Some(session) if !session.is_expired() => {
                session.touch();
                Ok(Some(Arc::clone(&session.context)))
            }
            // Expired entries stay until cleanup invalidates them
            _ => Ok(None),
        }
    }

    /// Validate `credential` within the session `id`.
    ///
    /// Concurrent validations of the same session run one after the other.
    pub fn validate<V: TokenValidator, U: UserInfoClient>(
        &self,
        id: SessionId,
        validator: &CredentialValidator<V, U>,
        credential: OidcCredential,
        config: &OidcConfig,
    ) -> Result<ValidationResult> {
        let context = self
            .context(id)?
            .ok_or_else(|| anyhow!("Unknown or expired session: {}", id))?;
        let mut context = context
            .lock()
            .map_err(|_| anyhow!("Identity context lock poisoned for session {}", id))?;

        Ok(validator.validate(credential, config, &mut context))
    }

    /// Log out: remove the session and clear its identity.
    pub fn invalidate(&self, id: SessionId) -> Result<bool> {
        let removed = self.write()?.remove(&id);
        match removed {
            Some(session) => {
                invalidate_context(&session)?;
                info!(session = %id, "Session invalidated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove all expired sessions, clearing their identities.
    /// Returns the number of sessions evicted.
    pub fn evict_expired(&self) -> Result<usize> {
        let expired: Vec<Session> = {
            let mut sessions = self.write()?;
            let ids: Vec<SessionId> = sessions
                .values()
                .filter(|s| s.is_expired())
                .map(|s| s.id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            invalidate_context(session)?;
        }

        Ok(expired.len())
    }

    /// Get session count (for metrics).
    pub fn session_count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow!("Session store lock poisoned"))?;
        Ok(sessions.len())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<SessionId, Session>>> {
        self.sessions
            .write()
            .map_err(|_| anyhow!("Session store lock poisoned"))
    }
}

/// Remove the least recently accessed session.
fn evict_lru(sessions: &mut HashMap<SessionId, Session>) -> Option<Session> {
    let oldest_id = sessions
        .values()
        .min_by_key(|s| s.last_accessed)
        .map(|s| s.id)?;
    sessions.remove(&oldest_id)
}

// Called after the store lock is released, so a thread holding a context
// never waits on the store while we wait on it.
fn invalidate_context(session: &Session) -> Result<()> {
    session
        .context
        .lock()
        .map_err(|_| anyhow!("Identity context lock poisoned for session {}", session.id))?
        .invalidate();
    Ok(())
}
