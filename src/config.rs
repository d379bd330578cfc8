use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Reads an optional environment variable, falling back to `default`.
fn env_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", key))
}

/// Connection and liveness settings for the cache link.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Optional password, overrides one embedded in the URL.
    pub password: Option<String>,
    /// The logical database index.
    pub db: i64,
    /// Delay between two liveness checks.
    pub ping_interval: Duration,
    /// Upper bound for a single connect or ping round trip.
    pub ping_timeout: Duration,
    /// Consecutive failed ping-and-rebuild attempts before giving up.
    pub max_retries: u32,
}

impl CacheConfig {
    /// Creates a new `CacheConfig` from environment variables.
    pub fn from_env() -> Result<Self> {
        let max_retries: u32 = env_or("CACHE_MAX_RETRIES", "5")?;
        if max_retries == 0 {
            anyhow::bail!("CACHE_MAX_RETRIES must be at least 1");
        }

        Ok(Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            db: env_or("REDIS_DB", "0")?,
            ping_interval: Duration::from_secs(env_or("CACHE_PING_INTERVAL_SECS", "5")?),
            ping_timeout: Duration::from_secs(env_or("CACHE_PING_TIMEOUT_SECS", "2")?),
            max_retries,
        })
    }
}

/// The authorization process configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Maximum number of pooled database connections.
    pub db_max_connections: usize,
    /// Address of the HTTP auth API.
    pub http_addr: SocketAddr,
    /// Address of the identity RPC server.
    pub rpc_addr: SocketAddr,
    /// Whether cookies are marked `Secure`.
    pub secure_cookies: bool,
    /// Session cache settings.
    pub cache: CacheConfig,
}

impl AuthConfig {
    /// Creates a new `AuthConfig` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AuthConfig`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", "16")?,
            http_addr: env_or("AUTH_HTTP_ADDR", "127.0.0.1:8080")?,
            rpc_addr: env_or("AUTH_RPC_ADDR", "127.0.0.1:50051")?,
            secure_cookies: is_production(),
            cache: CacheConfig::from_env()?,
        })
    }
}

/// Where the content process keeps posts and comments.
#[derive(Clone, Debug)]
pub enum PostStorage {
    /// Expiring JSON records behind a cache link.
    Cache(CacheConfig),
    /// Durable rows in PostgreSQL.
    Postgres {
        database_url: String,
        max_connections: usize,
    },
}

impl PostStorage {
    /// Picks the backend from `POSTS_IN_MEMORY` (default `true`).
    pub fn from_env() -> Result<Self> {
        if env_or::<bool>("POSTS_IN_MEMORY", "true")? {
            return Ok(Self::Cache(CacheConfig::from_env()?));
        }

        Ok(Self::Postgres {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set when POSTS_IN_MEMORY=false")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", "16")?,
        })
    }
}

/// The content process configuration.
#[derive(Clone, Debug)]
pub struct ContentConfig {
    /// Address of the HTTP posts API.
    pub http_addr: SocketAddr,
    /// Where the identity RPC server listens.
    pub identity_url: String,
    /// Deadline attached to every identity call.
    pub identity_timeout: Duration,
    /// Post storage backend.
    pub posts: PostStorage,
}

impl ContentConfig {
    /// Creates a new `ContentConfig` from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_addr: env_or("CONTENT_HTTP_ADDR", "127.0.0.1:8081")?,
            identity_url: env::var("IDENTITY_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50051".to_string()),
            identity_timeout: Duration::from_millis(env_or("IDENTITY_RPC_TIMEOUT_MS", "2000")?),
            posts: PostStorage::from_env()?,
        })
    }
}

fn is_production() -> bool {
    env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()) == "production"
}
