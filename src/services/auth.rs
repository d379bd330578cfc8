use crate::{
    error::Result,
    models::session::{Session, SessionOutcome},
    services::{accounts::AccountService, sessions::SessionManager},
};

/// The outcome of a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    Authenticated(Session),
    Rejected,
}

/// Composes session handling with account handling.
///
/// The two halves keep their own synchronization; only the operations that
/// span both live here.
pub struct AuthCore {
    sessions: SessionManager,
    accounts: AccountService,
}

impl AuthCore {
    /// Creates a new `AuthCore`.
    pub fn new(sessions: SessionManager, accounts: AccountService) -> Self {
        Self { sessions, accounts }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Checks credentials and issues a session on success.
    pub async fn sign_in(&self, login: &str, password: &str) -> Result<SignIn> {
        let Some(user) = self.accounts.authenticate(login, password).await? else {
            return Ok(SignIn::Rejected);
        };

        match self.sessions.create_session(&user.login).await? {
            SessionOutcome::Created(session) => Ok(SignIn::Authenticated(session)),
            SessionOutcome::Rejected => Ok(SignIn::Rejected),
        }
    }

    /// Resolves a session id to the numeric id of its owner.
    ///
    /// The account is looked up fresh on every call; an account removed after
    /// the session was issued surfaces as the profile store's error.
    pub async fn resolve_user_id(&self, sid: &str) -> Result<i64> {
        let login = self.sessions.resolve_login(sid).await?;
        self.accounts.user_id(&login).await.inspect_err(|e| {
            tracing::error!("❌ Failed to fetch id for {}: {}", login, e);
        })
    }

    /// The role of user `id`.
    pub async fn resolve_user_role(&self, id: i64) -> Result<String> {
        self.accounts.resolve_user_role(id).await
    }
}
