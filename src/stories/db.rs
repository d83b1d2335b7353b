//! Database operations for stories.
//!
//! Every read here carries `expires_at > NOW()`; an expired story is
//! indistinguishable from a deleted one regardless of whether the sweeper
//! has caught up.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Story lifetime, fixed at creation.
pub const STORY_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub author_username: String,
    pub author_name: String,
    pub author_avatar: String,
    pub author_verified: bool,
    pub viewers_count: i64,
    pub is_viewed: bool,
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ViewerInfo {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: String,
    pub viewed_at: DateTime<Utc>,
}

const STORY_SELECT: &str = "SELECT s.id, s.user_id, s.image, s.created_at, s.expires_at, \
       u.username AS author_username, u.name AS author_name, \
       u.avatar AS author_avatar, u.verified AS author_verified, \
       (SELECT COUNT(*) FROM story_views v WHERE v.story_id = s.id) AS viewers_count, \
       EXISTS(SELECT 1 FROM story_views v WHERE v.story_id = s.id AND v.user_id = $1) AS is_viewed \
 FROM stories s JOIN users u ON u.id = s.user_id";

pub async fn create_story(pool: &PgPool, user_id: Uuid, image: &str) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO stories (id, user_id, image, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(user_id)
    .bind(image)
    .bind(now)
    .bind(now + Duration::hours(STORY_TTL_HOURS))
    .execute(pool)
    .await?;
    Ok(id)
}

/// Active stories visible to the actor: their own plus followed users',
/// most recent first.
pub async fn active_for_actor(pool: &PgPool, actor: Uuid) -> Result<Vec<StoryRow>, sqlx::Error> {
    sqlx::query_as::<_, StoryRow>(&format!(
        "{STORY_SELECT} \
         WHERE s.expires_at > NOW() \
           AND (s.user_id = $1 \
                OR s.user_id IN (SELECT followed_id FROM follows WHERE follower_id = $1)) \
         ORDER BY s.created_at DESC"
    ))
    .bind(actor)
    .fetch_all(pool)
    .await
}

/// A single active story; expired stories do not resolve.
pub async fn find_active(
    pool: &PgPool,
    id: Uuid,
    viewer: Uuid,
) -> Result<Option<StoryRow>, sqlx::Error> {
    sqlx::query_as::<_, StoryRow>(&format!(
        "{STORY_SELECT} WHERE s.id = $2 AND s.expires_at > NOW()"
    ))
    .bind(viewer)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Add the viewer to the story's view set. Returns `false` when the view
/// was already recorded, making repeat views a no-op.
pub async fn mark_viewed(pool: &PgPool, story_id: Uuid, viewer: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO story_views (story_id, user_id, viewed_at) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(story_id)
    .bind(viewer)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete_story(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM stories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Viewer identities for a story, in view order.
pub async fn viewers(pool: &PgPool, story_id: Uuid) -> Result<Vec<ViewerInfo>, sqlx::Error> {
    sqlx::query_as::<_, ViewerInfo>(
        "SELECT u.id, u.username, u.name, u.avatar, v.viewed_at \
         FROM story_views v JOIN users u ON u.id = v.user_id \
         WHERE v.story_id = $1 \
         ORDER BY v.viewed_at ASC",
    )
    .bind(story_id)
    .fetch_all(pool)
    .await
}

/// Physically remove every expired story. Used by the background sweeper.
pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM stories WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
