use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::error::Result;

/// How long a caller waits for a free connection before `AppError::Pool`.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for opening one new connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Upper bound for the health check run when a connection is reused.
const RECYCLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Builds the PostgreSQL pool shared by the profile and post stores.
///
/// The URL is handed to `tokio_postgres` whole, so every connection parameter
/// it understands (hosts, ports, `sslmode`, `application_name`) is honoured.
/// No connection is opened here; the first checkout dials.
pub fn create_pool(database_url: &str, max_size: usize) -> Result<Pool> {
    let pg_config: tokio_postgres::Config = database_url.parse()?;
    let manager = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );

    let pool = Pool::builder(manager)
        .max_size(max_size)
        .runtime(Runtime::Tokio1)
        .wait_timeout(Some(CHECKOUT_TIMEOUT))
        .create_timeout(Some(CONNECT_TIMEOUT))
        .recycle_timeout(Some(RECYCLE_TIMEOUT))
        .build()?;

    tracing::debug!("PostgreSQL pool built (max {} connections)", max_size);
    Ok(pool)
}
