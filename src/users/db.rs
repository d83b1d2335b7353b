//! Database operations for users and the follow graph.
//!
//! The follow relationship is a single row in `follows`; "followers of U"
//! and "following of U" are the two read directions of that table, and a
//! follow or unfollow is always a single write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Full user row. Deliberately not `Serialize`: the password hash must
/// never reach a response, so handlers copy fields out explicitly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub website: String,
    pub verified: bool,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal identity used by the auth middleware.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BasicUser {
    pub id: Uuid,
    pub username: String,
}

/// Public identity attached to followers lists and suggestions.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FollowerInfo {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SuggestionInfo {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub verified: bool,
    pub followers_count: i64,
}

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, name, avatar, bio, website, \
                            verified, is_private, created_at, updated_at";

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    name: &str,
    avatar: &str,
) -> Result<UserRecord, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, UserRecord>(&format!(
        "INSERT INTO users (id, username, email, password_hash, name, avatar, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(avatar)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_basic_by_id(pool: &PgPool, id: Uuid) -> Result<Option<BasicUser>, sqlx::Error> {
    sqlx::query_as::<_, BasicUser>("SELECT id, username FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn follow_counts(pool: &PgPool, id: Uuid) -> Result<FollowCounts, sqlx::Error> {
    sqlx::query_as::<_, FollowCounts>(
        "SELECT \
           (SELECT COUNT(*) FROM follows WHERE followed_id = $1) AS followers, \
           (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following",
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: ProfileUpdate,
) -> Result<UserRecord, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(&format!(
        "UPDATE users SET \
           name = COALESCE($2, name), \
           bio = COALESCE($3, bio), \
           website = COALESCE($4, website), \
           avatar = COALESCE($5, avatar), \
           updated_at = $6 \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name)
    .bind(update.bio)
    .bind(update.website)
    .bind(update.avatar)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

pub async fn set_avatar(pool: &PgPool, id: Uuid, avatar: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET avatar = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(avatar)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert the follow edge. Returns `false` when the edge already exists.
pub async fn follow(pool: &PgPool, follower: Uuid, followed: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO follows (follower_id, followed_id, created_at) \
         VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(follower)
    .bind(followed)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove the follow edge; idempotent.
pub async fn unfollow(pool: &PgPool, follower: Uuid, followed: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower)
        .bind(followed)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn followers_of(pool: &PgPool, id: Uuid) -> Result<Vec<FollowerInfo>, sqlx::Error> {
    sqlx::query_as::<_, FollowerInfo>(
        "SELECT u.id, u.username, u.name, u.avatar, u.bio \
         FROM follows f \
         JOIN users u ON u.id = f.follower_id \
         WHERE f.followed_id = $1 \
         ORDER BY f.created_at DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await
}

/// Users the actor does not follow yet, excluding the actor. Ordered by
/// account recency so the result is stable across requests.
pub async fn suggestions(
    pool: &PgPool,
    actor: Uuid,
    limit: i64,
) -> Result<Vec<SuggestionInfo>, sqlx::Error> {
    sqlx::query_as::<_, SuggestionInfo>(
        "SELECT u.id, u.username, u.name, u.avatar, u.bio, u.verified, \
                (SELECT COUNT(*) FROM follows f WHERE f.followed_id = u.id) AS followers_count \
         FROM users u \
         WHERE u.id <> $1 \
           AND u.id NOT IN (SELECT followed_id FROM follows WHERE follower_id = $1) \
         ORDER BY u.created_at DESC \
         LIMIT $2",
    )
    .bind(actor)
    .bind(limit)
    .fetch_all(pool)
    .await
}
