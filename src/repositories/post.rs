use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::{
    cache::link::{CacheLink, SetMode},
    error::{AppError, Result},
    models::post::{Comment, Post},
};

/// Storage for posts and their comments.
///
/// Ids are allocated by the store. Listings are ordered by id.
#[async_trait]
pub trait PostRepository: Send + Sync + 'static {
    /// Stores a new post and returns it with its allocated id.
    async fn add_post(&self, user_id: i64, content: String, comments_allowed: bool) -> Result<Post>;

    /// Fetches one post, `AppError::NotFound` when absent.
    async fn get_post(&self, id: i64) -> Result<Post>;

    async fn list_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>>;

    /// Stores a new comment on `post_id`. The caller checks the post and the parent.
    async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        content: String,
    ) -> Result<Comment>;

    /// Whether `comment_id` exists on `post_id`.
    async fn comment_exists(&self, post_id: i64, comment_id: i64) -> Result<bool>;

    async fn list_comments(
        &self,
        post_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Comment>>;
}

/// TTL applied to every post and comment record.
pub const RECORD_TTL: Duration = Duration::from_secs(24 * 3600);

const POST_SEQ_KEY: &str = "seq:post";

fn post_key(id: i64) -> String {
    format!("post:{}", id)
}

fn comment_key(post_id: i64, comment_id: i64) -> String {
    format!("comment:{}:{}", post_id, comment_id)
}

fn comment_seq_key(post_id: i64) -> String {
    format!("seq:comment:{}", post_id)
}

/// Parses the trailing numeric id out of keys such as `post:7` or `comment:7:3`.
fn trailing_id(key: &str) -> Option<i64> {
    key.rsplit(':').next()?.parse().ok()
}

fn paginate<T>(mut items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(..offset);
    items.truncate(limit);
    items
}

/// Posts and comments kept on the cache link as JSON records that expire
/// after [`RECORD_TTL`].
#[derive(Clone)]
pub struct CachePostStore {
    link: CacheLink,
}

impl CachePostStore {
    /// Creates a new `CachePostStore`.
    pub fn new(link: CacheLink) -> Self {
        Self { link }
    }
}

#[async_trait]
impl PostRepository for CachePostStore {
    async fn add_post(
        &self,
        user_id: i64,
        content: String,
        comments_allowed: bool,
    ) -> Result<Post> {
        let post = Post {
            id: self.link.incr(POST_SEQ_KEY).await?,
            user_id,
            content,
            created_at: Utc::now(),
            comments_allowed,
        };

        let post_json = sonic_rs::to_string(&post)?;
        self.link
            .set(&post_key(post.id), &post_json, RECORD_TTL, SetMode::Always)
            .await?;

        tracing::debug!("Post stored: post:{}", post.id);
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Post> {
        let post_json = self
            .link
            .get(&post_key(id))
            .await?
            .ok_or(AppError::NotFound("post"))?;
        Ok(sonic_rs::from_str(&post_json)?)
    }

    async fn list_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>> {
        let mut ids: Vec<i64> = self
            .link
            .keys("post:*")
            .await?
            .iter()
            .filter_map(|key| trailing_id(key))
            .collect();
        ids.sort_unstable();

        let mut posts = Vec::new();
        for id in paginate(ids, limit, offset) {
            // Records can expire between KEYS and GET.
            if let Some(post_json) = self.link.get(&post_key(id)).await? {
                posts.push(sonic_rs::from_str(&post_json)?);
            }
        }
        Ok(posts)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        content: String,
    ) -> Result<Comment> {
        let comment = Comment {
            id: self.link.incr(&comment_seq_key(post_id)).await?,
            user_id,
            post_id,
            parent_id,
            content,
            created_at: Utc::now(),
        };

        let comment_json = sonic_rs::to_string(&comment)?;
        self.link
            .set(
                &comment_key(post_id, comment.id),
                &comment_json,
                RECORD_TTL,
                SetMode::Always,
            )
            .await?;

        tracing::debug!("Comment stored: comment:{}:{}", post_id, comment.id);
        Ok(comment)
    }

    async fn comment_exists(&self, post_id: i64, comment_id: i64) -> Result<bool> {
        Ok(self.link.get(&comment_key(post_id, comment_id)).await?.is_some())
    }

    async fn list_comments(
        &self,
        post_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Comment>> {
        let mut ids: Vec<i64> = self
            .link
            .keys(&format!("comment:{}:*", post_id))
            .await?
            .iter()
            .filter_map(|key| trailing_id(key))
            .collect();
        ids.sort_unstable();

        let mut comments = Vec::new();
        for id in paginate(ids, limit, offset) {
            if let Some(comment_json) = self.link.get(&comment_key(post_id, id)).await? {
                comments.push(sonic_rs::from_str(&comment_json)?);
            }
        }
        Ok(comments)
    }
}

/// PostgreSQL-backed post store; records do not expire.
#[derive(Clone)]
pub struct PgPostStore {
    pool: Pool,
}

impl PgPostStore {
    /// Creates a new `PgPostStore`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the `posts` and `comments` tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS posts (
                    id BIGSERIAL PRIMARY KEY,
                    user_id BIGINT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    comments_allowed BOOLEAN NOT NULL DEFAULT TRUE
                );
                CREATE TABLE IF NOT EXISTS comments (
                    id BIGSERIAL PRIMARY KEY,
                    post_id BIGINT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                    user_id BIGINT NOT NULL,
                    parent_id BIGINT REFERENCES comments(id) ON DELETE CASCADE,
                    content TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                CREATE INDEX IF NOT EXISTS comments_post_id_idx ON comments (post_id, id);
                "#,
            )
            .await?;
        tracing::info!("✅ Posts schema ready");
        Ok(())
    }
}

fn post_from_row(row: &Row) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        comments_allowed: row.try_get("comments_allowed")?,
    })
}

fn comment_from_row(row: &Row) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        post_id: row.try_get("post_id")?,
        parent_id: row.try_get("parent_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

/// LIMIT/OFFSET parameters; Postgres takes them as BIGINT.
fn page_params(limit: usize, offset: usize) -> (i64, i64) {
    (
        i64::try_from(limit).unwrap_or(i64::MAX),
        i64::try_from(offset).unwrap_or(i64::MAX),
    )
}

#[async_trait]
impl PostRepository for PgPostStore {
    async fn add_post(
        &self,
        user_id: i64,
        content: String,
        comments_allowed: bool,
    ) -> Result<Post> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO posts (user_id, content, comments_allowed)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, content, created_at, comments_allowed
                "#,
                &[&user_id, &content, &comments_allowed],
            )
            .await?;

        let post = post_from_row(&row)?;
        tracing::debug!("Post inserted: {}", post.id);
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Post> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, user_id, content, created_at, comments_allowed
                FROM posts
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?
            .ok_or(AppError::NotFound("post"))?;
        post_from_row(&row)
    }

    async fn list_posts(&self, limit: usize, offset: usize) -> Result<Vec<Post>> {
        let (limit, offset) = page_params(limit, offset);
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, user_id, content, created_at, comments_allowed
                FROM posts
                ORDER BY id
                LIMIT $1 OFFSET $2
                "#,
                &[&limit, &offset],
            )
            .await?;
        rows.iter().map(post_from_row).collect()
    }

    async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        content: String,
    ) -> Result<Comment> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO comments (post_id, user_id, parent_id, content)
                VALUES ($1, $2, $3, $4)
                RETURNING id, user_id, post_id, parent_id, content, created_at
                "#,
                &[&post_id, &user_id, &parent_id, &content],
            )
            .await?;

        let comment = comment_from_row(&row)?;
        tracing::debug!("Comment inserted: {} on post {}", comment.id, post_id);
        Ok(comment)
    }

    async fn comment_exists(&self, post_id: i64, comment_id: i64) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT 1 FROM comments WHERE post_id = $1 AND id = $2",
                &[&post_id, &comment_id],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn list_comments(
        &self,
        post_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Comment>> {
        let (limit, offset) = page_params(limit, offset);
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, user_id, post_id, parent_id, content, created_at
                FROM comments
                WHERE post_id = $1
                ORDER BY id
                LIMIT $2 OFFSET $3
                "#,
                &[&post_id, &limit, &offset],
            )
            .await?;
        rows.iter().map(comment_from_row).collect()
    }
}
