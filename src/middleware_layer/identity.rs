use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;

use crate::{error::AppError, middleware_layer::auth::extract_session_token, state::ContentState};

/// The caller of a content request, as resolved by the identity service.
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub user_id: i64,
}

/// A middleware that resolves the session cookie to a user id over RPC.
///
/// Requests without a session, or whose session the identity service does not
/// know, are rejected with 401.
pub async fn require_identity(
    State(state): State<ContentState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(sid) = extract_session_token(&cookies) else {
        tracing::warn!("❌ No session_id cookie found");
        return AppError::Authentication("Missing session".to_string()).into_response();
    };

    match state.identity.user_id(&sid).await {
        Ok(user_id) => {
            tracing::debug!("✅ Caller identified: {}", user_id);
            request.extensions_mut().insert(Caller { user_id });
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
