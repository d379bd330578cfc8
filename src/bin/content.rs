use std::future::IntoFuture;
use std::sync::Arc;

use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;

use keystone::{
    cache::{
        link::{CacheLink, LinkFailure, RetryPolicy},
        redis_conn::RedisConnector,
    },
    config::{ContentConfig, PostStorage},
    db, handlers,
    repositories::post::{CachePostStore, PgPostStore, PostRepository},
    rpc::client::IdentityRpcClient,
    state::ContentState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    keystone::init_tracing();

    let config = ContentConfig::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let (posts, link): (Arc<dyn PostRepository>, Option<CacheLink>) = match &config.posts {
        PostStorage::Cache(cache) => {
            let connector = Arc::new(RedisConnector::new(cache)?);
            let link = CacheLink::connect(connector, RetryPolicy::from(cache)).await?;
            tracing::info!("✅ Posts kept in Redis");
            (Arc::new(CachePostStore::new(link.clone())), Some(link))
        }
        PostStorage::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PgPostStore::new(db::create_pool(database_url, *max_connections)?);
            store.ensure_schema().await?;
            tracing::info!("✅ Posts kept in PostgreSQL (max {} connections)", max_connections);
            (Arc::new(store), None)
        }
    };

    let identity = IdentityRpcClient::connect_lazy(&config.identity_url, config.identity_timeout)?;
    let state = ContentState::new(posts, identity);

    let app = handlers::posts::router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::default())
            .on_request(DefaultOnRequest::default().level(Level::DEBUG))
            .on_response(DefaultOnResponse::default().level(Level::DEBUG))
            .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
    );

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!("🚀 Content API listening on http://{}", config.http_addr);

    tokio::select! {
        res = axum::serve(listener, app).into_future() => res?,
        failure = cache_lost(link) => {
            tracing::error!(
                ping_error = %failure.ping,
                rebuild_error = %failure.rebuild,
                "❌ Post cache lost, shutting down for restart"
            );
            anyhow::bail!("post cache unavailable: {} / {}", failure.ping, failure.rebuild);
        }
    }

    Ok(())
}

/// Resolves when the post cache gives up; never, for the PostgreSQL backend.
async fn cache_lost(link: Option<CacheLink>) -> LinkFailure {
    match link {
        Some(link) => link.closed().await,
        None => std::future::pending().await,
    }
}
