//! Session-based authorization with a self-healing Redis link, plus the
//! identity RPC that lets other services resolve sessions and roles.

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod cache {
    pub mod link;
    pub mod redis_conn;
}

pub mod crypto {
    pub mod password;
    pub mod sid;
}

pub mod models {
    pub mod post;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod post;
    pub mod profile;
    pub mod session;
}

pub mod services {
    pub mod accounts;
    pub mod auth;
    pub mod posts;
    pub mod sessions;
}

pub mod handlers {
    pub mod auth;
    pub mod posts;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod identity;
}

pub mod validation {
    pub mod auth;
}

pub mod rpc {
    pub mod proto {
        tonic::include_proto!("identity");
    }

    pub mod client;
    pub mod server;
}

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
