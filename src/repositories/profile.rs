use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;

use crate::{
    crypto::password,
    error::{AppError, Result},
    models::user::{DEFAULT_ROLE, UserAccount},
};

/// Durable storage of user accounts.
///
/// Implementations serialize concurrent writes themselves; callers hold no
/// lock around these operations.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    /// Creates an account. Fails with `AppError::AccountExists` for a taken login.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<()>;

    /// Whether an account exists for `login`.
    async fn find_user(&self, login: &str) -> Result<bool>;

    /// Checks credentials. `None` for an unknown login or a wrong password.
    async fn get_user(&self, login: &str, password: &str) -> Result<Option<UserAccount>>;

    /// The numeric id of the account for `login`.
    async fn get_user_profile_id(&self, login: &str) -> Result<i64>;

    /// The role of the account with `id`.
    async fn get_user_role(&self, id: i64) -> Result<String>;
}

/// PostgreSQL-backed profile store.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: Pool,
}

impl PgProfileStore {
    /// Creates a new `PgProfileStore`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the `profiles` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS profiles (
                    id BIGSERIAL PRIMARY KEY,
                    login TEXT NOT NULL UNIQUE,
                    password TEXT NOT NULL,
                    role TEXT NOT NULL DEFAULT '{}',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                DEFAULT_ROLE
            ))
            .await?;
        tracing::info!("✅ Profiles schema ready");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                INSERT INTO profiles (login, password)
                VALUES ($1, $2)
                "#,
                &[&login, &password_hash],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::AccountExists(login.to_string())
                } else {
                    AppError::Database(e)
                }
            })?;

        tracing::info!("✅ Profile created: {}", login);
        Ok(())
    }

    async fn find_user(&self, login: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT 1 FROM profiles WHERE login = $1", &[&login])
            .await?;
        Ok(row.is_some())
    }

    async fn get_user(&self, login: &str, password: &str) -> Result<Option<UserAccount>> {
        let client = self.pool.get().await?;
        let Some(row) = client
            .query_opt("SELECT password FROM profiles WHERE login = $1", &[&login])
            .await?
        else {
            return Ok(None);
        };

        let hash: String = row.try_get("password")?;
        if !password::verify_password(password, &hash)? {
            return Ok(None);
        }

        Ok(Some(UserAccount {
            login: login.to_string(),
        }))
    }

    async fn get_user_profile_id(&self, login: &str) -> Result<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id FROM profiles WHERE login = $1", &[&login])
            .await?
            .ok_or(AppError::NotFound("profile"))?;
        Ok(row.try_get("id")?)
    }

    async fn get_user_role(&self, id: i64) -> Result<String> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT role FROM profiles WHERE id = $1", &[&id])
            .await?
            .ok_or(AppError::NotFound("profile"))?;
        Ok(row.try_get("role")?)
    }
}
