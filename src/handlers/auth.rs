use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, CookieManagerLayer, Cookies};
use zeroize::Zeroize;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::{
        ActiveSession, SESSION_COOKIE, extract_session_token, require_session, session_cookie,
    },
    models::session::SessionOutcome,
    services::auth::SignIn,
    state::AuthState,
};

/// The request payload for sign-up and sign-in.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

impl Drop for CredentialsRequest {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload for session checks.
#[derive(Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
}

/// Builds the auth API router.
pub fn router(state: AuthState) -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(logout))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state.clone());

    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/session", get(session_status))
        .with_state(state)
        .merge(protected_routes)
        .layer(CookieManagerLayer::new())
}

/// Handles account creation; the new account is signed in right away.
pub async fn signup(
    State(state): State<AuthState>,
    cookies: Cookies,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response> {
    tracing::info!("📝 Sign-up attempt: {}", payload.login);

    state
        .core
        .accounts()
        .create_user_account(&payload.login, &payload.password)
        .await?;

    let session = match state.core.sessions().create_session(&payload.login).await? {
        SessionOutcome::Created(session) => session,
        SessionOutcome::Rejected => {
            return Err(AppError::Authentication(
                "Account created but no session could be issued".to_string(),
            ));
        }
    };

    cookies.add(session_cookie(session.sid().to_string(), state.secure_cookies));
    tracing::info!("✅ User registered: {}", payload.login);

    let response = AuthResponse {
        success: true,
        message: "Registration successful. Welcome!".to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles sign-in.
pub async fn signin(
    State(state): State<AuthState>,
    cookies: Cookies,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Sign-in attempt: {}", payload.login);

    let session = match state.core.sign_in(&payload.login, &payload.password).await? {
        SignIn::Authenticated(session) => session,
        SignIn::Rejected => {
            return Err(AppError::Authentication(
                "Invalid login or password".to_string(),
            ));
        }
    };

    cookies.add(session_cookie(session.sid().to_string(), state.secure_cookies));
    tracing::info!("✅ User logged in: {}", payload.login);

    let response = AuthResponse {
        success: true,
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles logout.
pub async fn logout(
    State(state): State<AuthState>,
    Extension(session): Extension<ActiveSession>,
    cookies: Cookies,
) -> Result<Response> {
    state.core.sessions().kill_session(&session.sid).await?;
    tracing::info!("✅ Session revoked");

    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Reports whether the request carries a live session.
pub async fn session_status(
    State(state): State<AuthState>,
    cookies: Cookies,
) -> Result<Json<SessionStatus>> {
    let authenticated = match extract_session_token(&cookies) {
        Some(sid) => state.core.sessions().find_active_session(&sid).await?,
        None => false,
    };

    Ok(Json(SessionStatus { authenticated }))
}
