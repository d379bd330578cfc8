use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, oneshot, watch};

use crate::config::CacheConfig;
use crate::error::{AppError, Result};

/// How a `set` treats an existing key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetMode {
    /// Overwrite whatever is stored.
    Always,
    /// Only write when the key is absent; reports "not applied" otherwise.
    IfAbsent,
}

/// One live connection to the key-value store.
#[async_trait]
pub trait CacheConnection: Send + Sync + 'static {
    /// Round-trips a liveness check.
    async fn ping(&self) -> Result<()>;

    /// Reads a value, `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value with a TTL. Returns whether the write was applied.
    async fn set(&self, key: &str, value: &str, ttl: Duration, mode: SetMode) -> Result<bool>;

    /// Removes a key. Returns whether something was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Atomically increments a counter, creating it at zero.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Lists keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Opens connections with fixed address and credentials.
#[async_trait]
pub trait CacheConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn CacheConnection>>;
}

/// Liveness loop tuning.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// Bounds every connect and every ping, at startup and in the loop.
    pub ping_timeout: Duration,
    pub max_retries: u32,
}

impl From<&CacheConfig> for RetryPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            interval: config.ping_interval,
            ping_timeout: config.ping_timeout,
            max_retries: config.max_retries,
        }
    }
}

/// The last errors seen before the liveness loop gave up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkFailure {
    pub ping: String,
    pub rebuild: String,
}

impl From<LinkFailure> for AppError {
    fn from(failure: LinkFailure) -> Self {
        AppError::CacheExhausted {
            ping: failure.ping,
            rebuild: failure.rebuild,
        }
    }
}

struct LinkInner {
    connector: Arc<dyn CacheConnector>,
    handle: RwLock<Arc<dyn CacheConnection>>,
    terminal: watch::Sender<Option<LinkFailure>>,
}

/// A self-healing handle to the cache store, shared process-wide.
///
/// The underlying connection is swapped as a whole by the liveness loop.
/// Operations load the current connection once, so a call that races a
/// rebuild runs entirely on either the old or the new connection. Operations
/// are never retried here; a call that fails during a reconnect surfaces its
/// error to the caller.
#[derive(Clone)]
pub struct CacheLink {
    inner: Arc<LinkInner>,
}

impl CacheLink {
    /// Connects, checks liveness once and starts the background loop.
    ///
    /// Fails fast with `AppError::Connection` when the store cannot be reached
    /// at startup, including a connect or ping that outlasts `ping_timeout`.
    /// Returns only after the loop's first check has completed: either the
    /// link is live, or the loop exhausted its retries and the terminal error
    /// is returned instead.
    pub async fn connect(connector: Arc<dyn CacheConnector>, policy: RetryPolicy) -> Result<Self> {
        let connection = bounded(policy.ping_timeout, "connect", connector.connect())
            .await
            .map_err(AppError::Connection)?;
        bounded(policy.ping_timeout, "ping", connection.ping())
            .await
            .map_err(AppError::Connection)?;

        let (terminal, _) = watch::channel(None);
        let inner = Arc::new(LinkInner {
            connector,
            handle: RwLock::new(connection),
            terminal,
        });

        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(liveness_loop(Arc::downgrade(&inner), policy, ready_tx));

        match ready_rx.await {
            Ok(Ok(())) => {
                tracing::info!("✅ Cache link established");
                Ok(Self { inner })
            }
            Ok(Err(failure)) => Err(failure.into()),
            Err(_) => Err(AppError::Internal("cache liveness task stopped".to_string())),
        }
    }

    /// The terminal failure, once the liveness loop has given up.
    pub fn failure(&self) -> Option<LinkFailure> {
        self.inner.terminal.borrow().clone()
    }

    /// Resolves when the liveness loop has given up for good.
    pub async fn closed(&self) -> LinkFailure {
        let mut rx = self.inner.terminal.subscribe();
        loop {
            if let Some(failure) = rx.borrow_and_update().clone() {
                return failure;
            }
            if rx.changed().await.is_err() {
                return LinkFailure {
                    ping: "link dropped".to_string(),
                    rebuild: "link dropped".to_string(),
                };
            }
        }
    }

    async fn current(&self) -> Result<Arc<dyn CacheConnection>> {
        if let Some(failure) = self.failure() {
            return Err(failure.into());
        }
        Ok(self.inner.handle.read().await.clone())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.current().await?.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration, mode: SetMode) -> Result<bool> {
        self.current().await?.set(key, value, ttl, mode).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.current().await?.delete(key).await
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        self.current().await?.incr(key).await
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.current().await?.keys(pattern).await
    }
}

impl LinkInner {
    /// One ping, then one rebuild if the ping failed.
    async fn check(&self, policy: &RetryPolicy) -> std::result::Result<(), LinkFailure> {
        let connection = self.handle.read().await.clone();
        let Err(ping_err) = bounded(policy.ping_timeout, "ping", connection.ping()).await else {
            return Ok(());
        };

        match self.rebuild(policy).await {
            Ok(()) => {
                tracing::warn!(
                    ping_error = %ping_err,
                    "⚠️  Cache ping failed, connection rebuilt"
                );
                Ok(())
            }
            Err(rebuild_err) => Err(LinkFailure {
                ping: ping_err,
                rebuild: rebuild_err,
            }),
        }
    }

    async fn rebuild(&self, policy: &RetryPolicy) -> std::result::Result<(), String> {
        let fresh = bounded(policy.ping_timeout, "connect", self.connector.connect()).await?;
        bounded(policy.ping_timeout, "ping", fresh.ping()).await?;

        *self.handle.write().await = fresh;
        Ok(())
    }
}

/// Runs one store round trip under `limit`, flattening both failure kinds to text.
async fn bounded<T>(
    limit: Duration,
    what: &str,
    call: impl Future<Output = Result<T>>,
) -> std::result::Result<T, String> {
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("{} timed out after {:?}", what, limit)),
    }
}

async fn liveness_loop(
    inner: Weak<LinkInner>,
    policy: RetryPolicy,
    ready: oneshot::Sender<std::result::Result<(), LinkFailure>>,
) {
    let max_retries = policy.max_retries.max(1);
    let mut ready = Some(ready);
    let mut retries = 0u32;

    loop {
        let Some(link) = inner.upgrade() else {
            tracing::debug!("Cache link dropped, stopping liveness loop");
            return;
        };

        match link.check(&policy).await {
            Ok(()) => {
                retries = 0;
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Err(failure) => {
                retries += 1;
                tracing::error!(
                    ping_error = %failure.ping,
                    rebuild_error = %failure.rebuild,
                    attempt = retries,
                    max_retries,
                    "❌ Cache ping and rebuild failed"
                );

                if retries >= max_retries {
                    tracing::error!(
                        ping_error = %failure.ping,
                        rebuild_error = %failure.rebuild,
                        "❌ Cache link exhausted its retries"
                    );
                    link.terminal.send_replace(Some(failure.clone()));
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(failure));
                    }
                    return;
                }
            }
        }

        drop(link);
        tokio::time::sleep(policy.interval).await;
    }
}
