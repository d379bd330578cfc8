use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a session lives, enforced by the cache store's TTL.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

/// Represents a user session.
///
/// A session is written once and never mutated. It disappears when it is
/// revoked or when the store expires it; `expires_at` is informational and is
/// not re-checked on lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    login: String,
    sid: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Issues a new session for `login` that expires a full lifetime after `now`.
    pub fn issue(login: impl Into<String>, sid: String, now: DateTime<Utc>) -> Self {
        Self {
            login: login.into(),
            sid,
            expires_at: now + Duration::hours(SESSION_LIFETIME_HOURS),
        }
    }

    /// The login the session was issued for.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The opaque session id.
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// The timestamp when the session expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// The result of asking for a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The session was stored and is active.
    Created(Session),
    /// The store did not apply the write; the caller is not authenticated.
    Rejected,
}
