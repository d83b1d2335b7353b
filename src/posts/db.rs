//! Database operations for posts, engagement and comments.
//!
//! Like and comment counts are computed by the database from their source
//! tables on every read; nothing stores a counter that could drift. The
//! explore ordering sorts on the computed like count directly in SQL for
//! the same reason.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// A post with author summary, derived counts and actor-relative flags.
/// `is_liked`/`is_saved` are false when the query ran without a viewer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image: String,
    pub caption: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_name: String,
    pub author_avatar: String,
    pub author_verified: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub is_saved: bool,
}

/// Thumbnail used on profile pages.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostThumbnail {
    pub id: Uuid,
    pub image: String,
    pub likes_count: i64,
    pub comments_count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar: String,
    pub likes_count: i64,
}

/// Inline reply attached to a comment.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReplyRow {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar: String,
}

/// Just enough of a comment to authorize deletion.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentMeta {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
}

// Shared select list; $1 is always the (possibly NULL) viewer id, so the
// EXISTS probes collapse to false for anonymous reads.
const POST_SELECT: &str = "SELECT p.id, p.user_id, p.image, p.caption, p.location, p.created_at, \
       u.username AS author_username, u.name AS author_name, \
       u.avatar AS author_avatar, u.verified AS author_verified, \
       (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count, \
       (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count, \
       EXISTS(SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = $1) AS is_liked, \
       EXISTS(SELECT 1 FROM post_saves s WHERE s.post_id = p.id AND s.user_id = $1) AS is_saved \
 FROM posts p JOIN users u ON u.id = p.user_id";

const FEED_PREDICATE: &str = "p.user_id = $1 \
 OR p.user_id IN (SELECT followed_id FROM follows WHERE follower_id = $1)";

/// One page of the following-scoped feed, newest first.
pub async fn feed_page(
    pool: &PgPool,
    actor: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!(
        "{POST_SELECT} WHERE {FEED_PREDICATE} ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(actor)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Total matching the same predicate as [`feed_page`].
pub async fn feed_total(pool: &PgPool, actor: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM posts p WHERE {FEED_PREDICATE}"
    ))
    .bind(actor)
    .fetch_one(pool)
    .await
}

/// One page of the global explore feed: most liked first, ties broken by
/// recency.
pub async fn explore_page(
    pool: &PgPool,
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!(
        "{POST_SELECT} ORDER BY likes_count DESC, p.created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn explore_total(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
}

pub async fn find_post(
    pool: &PgPool,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Option<PostRow>, sqlx::Error> {
    sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $2"))
        .bind(viewer)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create_post(
    pool: &PgPool,
    user_id: Uuid,
    image: &str,
    caption: &str,
    location: &str,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO posts (id, user_id, image, caption, location, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $6)",
    )
    .bind(id)
    .bind(user_id)
    .bind(image)
    .bind(caption)
    .bind(location)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(id)
}

/// Delete a post and its comments, dependents first, in one transaction
/// so there is never a visible moment of orphaned comments.
pub async fn delete_post(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM comments WHERE post_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Flip the actor's membership in the like set. The insert is
/// conflict-aware, so rapid repeated toggles stay consistent call by call.
pub async fn toggle_like(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<(bool, i64), sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO post_likes (post_id, user_id, created_at) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await?
    .rows_affected()
        == 1;

    if !inserted {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    }

    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(pool)
            .await?;

    Ok((inserted, count))
}

/// Flip the actor's membership in the saved set.
pub async fn toggle_save(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO post_saves (post_id, user_id, created_at) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(pool)
    .await?
    .rows_affected()
        == 1;

    if !inserted {
        sqlx::query("DELETE FROM post_saves WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    }

    Ok(inserted)
}

/// Owner of a post, if the post exists.
pub async fn post_owner(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn thumbnails_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<PostThumbnail>, sqlx::Error> {
    sqlx::query_as::<_, PostThumbnail>(
        "SELECT p.id, p.image, \
                (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS likes_count, \
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count \
         FROM posts p WHERE p.user_id = $1 ORDER BY p.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, c.text, c.created_at, \
       u.username AS author_username, u.avatar AS author_avatar, \
       (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS likes_count \
 FROM comments c JOIN users u ON u.id = c.user_id";

pub async fn insert_comment(
    pool: &PgPool,
    user_id: Uuid,
    post_id: Uuid,
    text: &str,
) -> Result<CommentRow, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO comments (id, user_id, post_id, text, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(user_id)
    .bind(post_id)
    .bind(text)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn find_comment(pool: &PgPool, id: Uuid) -> Result<Option<CommentMeta>, sqlx::Error> {
    sqlx::query_as::<_, CommentMeta>("SELECT id, user_id, post_id FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete_comment(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All comments on a post, newest first.
pub async fn comments_for_post(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Vec<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at DESC"
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await
}

/// The most recent `per_post` comments for each of the given posts; used
/// to preview comments on feed pages without a query per post.
pub async fn recent_comments(
    pool: &PgPool,
    post_ids: &[Uuid],
    per_post: i64,
) -> Result<Vec<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(
        "SELECT id, post_id, user_id, text, created_at, author_username, author_avatar, likes_count \
         FROM ( \
           SELECT c.id, c.post_id, c.user_id, c.text, c.created_at, \
                  u.username AS author_username, u.avatar AS author_avatar, \
                  (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS likes_count, \
                  ROW_NUMBER() OVER (PARTITION BY c.post_id ORDER BY c.created_at DESC) AS rank \
           FROM comments c JOIN users u ON u.id = c.user_id \
           WHERE c.post_id = ANY($1) \
         ) ranked \
         WHERE rank <= $2 \
         ORDER BY post_id, created_at DESC",
    )
    .bind(post_ids.to_vec())
    .bind(per_post)
    .fetch_all(pool)
    .await
}

/// Replies for a set of comments, oldest first within each comment.
pub async fn replies_for_comments(
    pool: &PgPool,
    comment_ids: &[Uuid],
) -> Result<Vec<ReplyRow>, sqlx::Error> {
    sqlx::query_as::<_, ReplyRow>(
        "SELECT r.id, r.comment_id, r.user_id, r.text, r.created_at, \
                u.username AS author_username, u.avatar AS author_avatar \
         FROM comment_replies r JOIN users u ON u.id = r.user_id \
         WHERE r.comment_id = ANY($1) \
         ORDER BY r.created_at ASC",
    )
    .bind(comment_ids.to_vec())
    .fetch_all(pool)
    .await
}
