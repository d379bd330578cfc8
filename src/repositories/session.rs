use std::time::Duration;

use crate::{
    cache::link::{CacheLink, SetMode},
    error::{AppError, Result},
    models::session::{SESSION_LIFETIME_HOURS, Session},
};

/// TTL the store enforces on every session record.
pub const SESSION_TTL: Duration = Duration::from_secs(SESSION_LIFETIME_HOURS as u64 * 3600);

fn session_key(sid: &str) -> String {
    format!("session:{}", sid)
}

/// Session-shaped operations over the cache link.
#[derive(Clone)]
pub struct SessionStore {
    link: CacheLink,
}

impl SessionStore {
    /// Creates a new `SessionStore`.
    pub fn new(link: CacheLink) -> Self {
        Self { link }
    }

    /// Stores a new session under `session:<sid>`.
    ///
    /// Returns `Ok(false)` when the store did not apply the write (a record
    /// already exists under that sid); every other failure is an error.
    pub async fn save_session(&self, session: &Session) -> Result<bool> {
        let session_json = sonic_rs::to_string(session)?;
        let stored = self
            .link
            .set(&session_key(session.sid()), &session_json, SESSION_TTL, SetMode::IfAbsent)
            .await
            .map_err(|e| {
                tracing::error!("❌ Session write failed: {}", e);
                e
            })?;

        if stored {
            tracing::debug!("Session saved: session:{}", session.sid());
        } else {
            tracing::warn!("⚠️  Session write not applied: session:{}", session.sid());
        }
        Ok(stored)
    }

    /// Whether a live record exists for `sid`.
    pub async fn find_session(&self, sid: &str) -> Result<bool> {
        Ok(self.link.get(&session_key(sid)).await?.is_some())
    }

    /// Removes the record for `sid`. Returns whether one existed.
    pub async fn delete_session(&self, sid: &str) -> Result<bool> {
        self.link.delete(&session_key(sid)).await
    }

    /// The login a live session was issued for.
    ///
    /// Fails with `AppError::NotFound` when the record is absent or expired.
    pub async fn resolve_login(&self, sid: &str) -> Result<String> {
        let session_json = self
            .link
            .get(&session_key(sid))
            .await?
            .ok_or(AppError::NotFound("session"))?;

        let session: Session = sonic_rs::from_str(&session_json)?;
        Ok(session.login().to_string())
    }
}
