use crate::{
    error::{AppError, Result},
    models::post::{Comment, Post},
    repositories::post::PostRepository,
};

/// The longest accepted post body, in characters.
pub const MAX_POST_LENGTH: usize = 10_000;
/// The longest accepted comment body, in characters.
pub const MAX_COMMENT_LENGTH: usize = 2_000;

fn validate_body(content: &str, max: usize, what: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", what)));
    }

    if content.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            what, max
        )));
    }

    Ok(())
}

/// Publishes a post for an identified user.
pub async fn create_post(
    store: &dyn PostRepository,
    user_id: i64,
    content: String,
    comments_allowed: bool,
) -> Result<Post> {
    validate_body(&content, MAX_POST_LENGTH, "Post")?;

    let post = store.add_post(user_id, content, comments_allowed).await?;
    tracing::info!("✅ Post {} created by user {}", post.id, user_id);
    Ok(post)
}

/// Adds a comment to a post that accepts comments.
///
/// # Errors
///
/// `AppError::NotFound` when the post or the parent comment is missing,
/// `AppError::Validation` when the post has comments disabled or the body is
/// invalid.
pub async fn add_comment(
    store: &dyn PostRepository,
    post_id: i64,
    user_id: i64,
    parent_id: Option<i64>,
    content: String,
) -> Result<Comment> {
    validate_body(&content, MAX_COMMENT_LENGTH, "Comment")?;

    let post = store.get_post(post_id).await?;
    if !post.comments_allowed {
        return Err(AppError::Validation(
            "Comments are disabled for this post".to_string(),
        ));
    }

    if let Some(parent) = parent_id {
        if !store.comment_exists(post_id, parent).await? {
            return Err(AppError::NotFound("parent comment"));
        }
    }

    let comment = store.add_comment(post_id, user_id, parent_id, content).await?;
    tracing::info!("✅ Comment {} added to post {}", comment.id, post_id);
    Ok(comment)
}
