//! Session types.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use crate::identity::IdentityContext;

/// Unique session identifier (16-byte random value, hex-encoded for cookies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId([u8; 16]);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(rand::random())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A session and the identity context it owns.
///
/// The context sits behind its own mutex so that validations of one session
/// run one at a time without holding the store lock.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session ID.
    pub id: SessionId,

    /// Session creation time.
    pub created_at: DateTime<Utc>,

    /// Absolute expiry; access does not extend it.
    pub expires_at: DateTime<Utc>,

    /// Last access time (updated on each lookup).
    pub last_accessed: DateTime<Utc>,

    /// Identity state owned by this session.
    pub context: Arc<Mutex<IdentityContext>>,
}

impl Session {
    /// Create an unauthenticated session living for `ttl_secs`.
    ///
    /// TTLs beyond the representable time range never expire.
    pub fn new(ttl_secs: u64) -> Self {
        let now = Utc::now();
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: SessionId::new(),
            created_at: now,
            expires_at,
            last_accessed: now,
            context: Arc::new(Mutex::new(IdentityContext::new())),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }
}
