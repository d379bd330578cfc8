use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{models::session::SESSION_LIFETIME_HOURS, state::AuthState};

/// The cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session_id";

/// The session id of an authenticated request.
#[derive(Clone, Debug)]
pub struct ActiveSession {
    pub sid: String,
}

/// Extracts the session token from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the session ID if found.
pub fn extract_session_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|sid| !sid.is_empty())
}

/// Builds the session cookie handed out at sign-in.
pub fn session_cookie(sid: String, secure: bool) -> tower_cookies::Cookie<'static> {
    let mut cookie = tower_cookies::Cookie::new(SESSION_COOKIE, sid);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(tower_cookies::cookie::time::Duration::hours(SESSION_LIFETIME_HOURS));
    cookie.set_path("/");
    cookie
}

/// A middleware that requires a live session.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an error `StatusCode`.
pub async fn require_session(
    State(state): State<AuthState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    tracing::debug!("🔐 Checking session...");

    let sid = extract_session_token(&cookies).ok_or_else(|| {
        tracing::warn!("❌ No session_id cookie found");
        StatusCode::UNAUTHORIZED
    })?;

    let active = state
        .core
        .sessions()
        .find_active_session(&sid)
        .await
        .map_err(|e| {
            tracing::error!("❌ Session lookup failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    if !active {
        tracing::warn!("❌ Session not active");
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(ActiveSession { sid });
    Ok(next.run(request).await)
}
