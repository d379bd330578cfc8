use std::sync::Arc;

use crate::{
    repositories::post::PostRepository, rpc::client::IdentityRpcClient, services::auth::AuthCore,
};

/// Shared state of the authorization process's HTTP API.
#[derive(Clone)]
pub struct AuthState {
    /// Sessions and accounts.
    pub core: Arc<AuthCore>,
    /// Whether cookies are marked `Secure`.
    pub secure_cookies: bool,
}

/// Shared state of the content process's HTTP API.
#[derive(Clone)]
pub struct ContentState {
    /// Posts and comments, on whichever backend was chosen at startup.
    pub posts: Arc<dyn PostRepository>,
    /// Resolves callers against the authorization process.
    pub identity: IdentityRpcClient,
}

impl ContentState {
    /// Creates a new `ContentState`.
    pub fn new(posts: Arc<dyn PostRepository>, identity: IdentityRpcClient) -> Self {
        Self { posts, identity }
    }
}
