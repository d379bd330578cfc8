use std::sync::Arc;

use crate::{
    crypto::password,
    error::Result,
    models::user::UserAccount,
    repositories::profile::ProfileStore,
    validation::auth::{validate_login, validate_password},
};

/// Account creation and credential checks over a profile store.
#[derive(Clone)]
pub struct AccountService {
    profiles: Arc<dyn ProfileStore>,
}

impl AccountService {
    /// Creates a new `AccountService`.
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Creates an account after validating the login and password.
    ///
    /// # Errors
    ///
    /// `AppError::Validation` for a malformed login or password,
    /// `AppError::AccountExists` for a taken login, storage errors otherwise.
    pub async fn create_user_account(&self, login: &str, password: &str) -> Result<()> {
        validate_login(login).inspect_err(|_| {
            tracing::warn!("❌ Rejected malformed login");
        })?;
        validate_password(password)?;

        tracing::debug!("🔐 Creating account: {}", login);
        let hashed_password = password::hash_password(password)?;
        self.profiles
            .create_user(login, &hashed_password)
            .await
            .inspect_err(|e| tracing::error!("❌ Failed to create account {}: {}", login, e))
    }

    pub async fn find_user_by_login(&self, login: &str) -> Result<bool> {
        self.profiles.find_user(login).await
    }

    /// Checks a login/password pair.
    ///
    /// A wrong password or an unknown login is `Ok(None)`, not an error.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Option<UserAccount>> {
        tracing::debug!("🔐 Authenticating: {}", login);
        let user = self.profiles.get_user(login, password).await?;
        if user.is_none() {
            tracing::warn!("Invalid credentials for: {}", login);
        }
        Ok(user)
    }

    /// The numeric id for `login`.
    pub async fn user_id(&self, login: &str) -> Result<i64> {
        self.profiles.get_user_profile_id(login).await
    }

    /// The role for user `id`.
    pub async fn resolve_user_role(&self, id: i64) -> Result<String> {
        self.profiles
            .get_user_role(id)
            .await
            .inspect_err(|e| tracing::error!("❌ Failed to fetch role for {}: {}", id, e))
    }
}
