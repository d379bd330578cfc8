use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    crypto::sid::generate_sid,
    error::Result,
    models::session::{Session, SessionOutcome},
    repositories::session::SessionStore,
};

/// Issues, checks and revokes sessions.
///
/// Writers (`create_session`, `kill_session`) exclude each other and all
/// readers; readers run concurrently.
pub struct SessionManager {
    store: SessionStore,
    lock: RwLock<()>,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            lock: RwLock::new(()),
        }
    }

    /// Issues a fresh session for `login`.
    ///
    /// Returns `SessionOutcome::Rejected` when the store reported the write as
    /// not applied. Store failures are returned as errors.
    pub async fn create_session(&self, login: &str) -> Result<SessionOutcome> {
        let session = Session::issue(login, generate_sid(), Utc::now());

        let stored = {
            let _guard = self.lock.write().await;
            self.store.save_session(&session).await?
        };

        if !stored {
            return Ok(SessionOutcome::Rejected);
        }

        tracing::info!("✅ Session created for: {}", login);
        Ok(SessionOutcome::Created(session))
    }

    /// Revokes a session. Revoking an unknown session is not an error.
    pub async fn kill_session(&self, sid: &str) -> Result<()> {
        let _guard = self.lock.write().await;
        let deleted = self.store.delete_session(sid).await?;
        tracing::debug!("Session revoke for {}: deleted={}", sid, deleted);
        Ok(())
    }

    /// Whether `sid` names a live session.
    pub async fn find_active_session(&self, sid: &str) -> Result<bool> {
        let _guard = self.lock.read().await;
        self.store.find_session(sid).await
    }

    /// The login behind a live session, `AppError::NotFound` otherwise.
    pub async fn resolve_login(&self, sid: &str) -> Result<String> {
        let _guard = self.lock.read().await;
        self.store.resolve_login(sid).await
    }
}
