use std::future::IntoFuture;
use std::sync::Arc;

use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use keystone::{
    cache::{
        link::{CacheLink, RetryPolicy},
        redis_conn::RedisConnector,
    },
    config::AuthConfig,
    db, handlers,
    repositories::{profile::PgProfileStore, session::SessionStore},
    rpc,
    services::{accounts::AccountService, auth::AuthCore, sessions::SessionManager},
    state::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    keystone::init_tracing();

    let config = AuthConfig::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let pool = db::create_pool(&config.database_url, config.db_max_connections)?;
    let profiles = PgProfileStore::new(pool);
    profiles.ensure_schema().await?;
    tracing::info!(
        "✅ PostgreSQL pool initialized (max {} connections)",
        config.db_max_connections
    );

    let connector = Arc::new(RedisConnector::new(&config.cache)?);
    let link = CacheLink::connect(connector, RetryPolicy::from(&config.cache)).await?;

    let core = Arc::new(AuthCore::new(
        SessionManager::new(SessionStore::new(link.clone())),
        AccountService::new(Arc::new(profiles)),
    ));
    tracing::info!("✅ Authorization core initialized");

    let state = AuthState {
        core: core.clone(),
        secure_cookies: config.secure_cookies,
    };

    let app = handlers::auth::router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::default())
            .on_request(DefaultOnRequest::default().level(Level::DEBUG))
            .on_response(DefaultOnResponse::default().level(Level::DEBUG))
            .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
    );

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!("🚀 Auth API listening on http://{}", config.http_addr);

    tokio::select! {
        res = axum::serve(listener, app).into_future() => res?,
        res = rpc::server::serve(core, config.rpc_addr) => res?,
        failure = link.closed() => {
            tracing::error!(
                ping_error = %failure.ping,
                rebuild_error = %failure.rebuild,
                "❌ Session cache lost, shutting down for restart"
            );
            anyhow::bail!("session cache unavailable: {} / {}", failure.ping, failure.rebuild);
        }
    }

    Ok(())
}
