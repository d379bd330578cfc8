use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post in the content service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// The post's numeric id.
    pub id: i64,
    /// The author's user id, as resolved by the identity service.
    pub user_id: i64,
    /// The post body.
    pub content: String,
    /// The timestamp when the post was created.
    pub created_at: DateTime<Utc>,
    /// Whether readers may comment.
    pub comments_allowed: bool,
}

/// A comment attached to a post, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
