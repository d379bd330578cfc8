use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_cookies::CookieManagerLayer;

use crate::{
    error::Result,
    middleware_layer::identity::{Caller, require_identity},
    models::post::{Comment, Post},
    services::posts as post_service,
    state::ContentState,
};

/// Default page size for listings.
const DEFAULT_LIMIT: usize = 20;
/// Largest page size a caller may ask for.
const MAX_LIMIT: usize = 100;

/// Pagination query parameters.
#[derive(Deserialize, Debug, Default)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Page {
    fn bounds(&self) -> (usize, usize) {
        (
            self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            self.offset.unwrap_or(0),
        )
    }
}

/// The request payload for a new post.
#[derive(Deserialize, Debug)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default = "default_comments_allowed")]
    pub comments_allowed: bool,
}

fn default_comments_allowed() -> bool {
    true
}

/// The request payload for a new comment.
#[derive(Deserialize, Debug)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<i64>,
}

/// Who the caller is, according to the identity service.
#[derive(Serialize)]
pub struct WhoAmI {
    pub user_id: i64,
    pub role: String,
}

/// Builds the content API router.
pub fn router(state: ContentState) -> Router {
    let identified_routes = Router::new()
        .route("/api/posts", post(create_post))
        .route("/api/posts/{post_id}/comments", post(add_comment))
        .route("/api/me", get(who_am_i))
        .route_layer(from_fn_with_state(state.clone(), require_identity))
        .with_state(state.clone());

    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{post_id}", get(get_post))
        .route("/api/posts/{post_id}/comments", get(list_comments))
        .with_state(state)
        .merge(identified_routes)
        .layer(CookieManagerLayer::new())
}

/// Lists posts.
pub async fn list_posts(
    State(state): State<ContentState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Post>>> {
    let (limit, offset) = page.bounds();
    Ok(Json(state.posts.list_posts(limit, offset).await?))
}

/// Fetches one post.
pub async fn get_post(
    State(state): State<ContentState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Post>> {
    Ok(Json(state.posts.get_post(post_id).await?))
}

/// Lists a post's comments.
pub async fn list_comments(
    State(state): State<ContentState>,
    Path(post_id): Path<i64>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Comment>>> {
    let (limit, offset) = page.bounds();
    state.posts.get_post(post_id).await?;
    Ok(Json(state.posts.list_comments(post_id, limit, offset).await?))
}

/// Publishes a post for the caller.
pub async fn create_post(
    State(state): State<ContentState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Response> {
    let post = post_service::create_post(
        state.posts.as_ref(),
        caller.user_id,
        payload.content,
        payload.comments_allowed,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(post)).into_response())
}

/// Comments on a post as the caller.
pub async fn add_comment(
    State(state): State<ContentState>,
    Extension(caller): Extension<Caller>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Response> {
    let comment = post_service::add_comment(
        state.posts.as_ref(),
        post_id,
        caller.user_id,
        payload.parent_id,
        payload.content,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)).into_response())
}

/// Reports the caller's id and role.
pub async fn who_am_i(
    State(state): State<ContentState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<WhoAmI>> {
    let role = state.identity.user_role(caller.user_id).await?;
    Ok(Json(WhoAmI {
        user_id: caller.user_id,
        role,
    }))
}
