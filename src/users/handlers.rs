//! Handlers for `/api/users`: profiles, avatars, follow graph mutations
//! and follow suggestions.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::handlers::NAME_MAX;
use crate::error::{ApiError, ApiResult};
use crate::media;
use crate::middleware::auth::CurrentUser;
use crate::response::Envelope;
use crate::server::state::AppState;
use crate::users::db::{self, FollowerInfo, ProfileUpdate, SuggestionInfo, UserRecord};

const BIO_MAX: usize = 150;
const SUGGESTION_LIMIT: i64 = 5;

/// Public profile: everything except email and credentials, plus counts
/// and post thumbnails.
#[derive(Debug, Serialize)]
pub struct ProfilePayload {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub website: String,
    pub verified: bool,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub posts: Vec<crate::posts::db::PostThumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvatarPayload {
    pub avatar: String,
}

fn profile_payload(
    user: UserRecord,
    followers: i64,
    following: i64,
    posts: Vec<crate::posts::db::PostThumbnail>,
) -> ProfilePayload {
    ProfilePayload {
        id: user.id,
        username: user.username,
        name: user.name,
        avatar: user.avatar,
        bio: user.bio,
        website: user.website,
        verified: user.verified,
        is_private: user.is_private,
        created_at: user.created_at,
        followers_count: followers,
        following_count: following,
        posts_count: posts.len() as i64,
        posts,
    }
}

/// `GET /api/users/:username` - public profile with post thumbnails.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<Envelope<ProfilePayload>>> {
    let user = db::find_by_username(&state.pool, &username.to_lowercase())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let counts = db::follow_counts(&state.pool, user.id).await?;
    let posts = crate::posts::db::thumbnails_for_user(&state.pool, user.id).await?;

    Ok(Json(Envelope::data(profile_payload(
        user,
        counts.followers,
        counts.following,
        posts,
    ))))
}

fn validate_update(request: &UpdateProfileRequest) -> Result<(), ApiError> {
    if let Some(name) = &request.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        if name.trim().chars().count() > NAME_MAX {
            return Err(ApiError::validation("Name cannot exceed 50 characters"));
        }
    }
    if let Some(bio) = &request.bio {
        if bio.chars().count() > BIO_MAX {
            return Err(ApiError::validation("Bio cannot exceed 150 characters"));
        }
    }
    Ok(())
}

/// `PUT /api/users/profile` - partial update of the actor's text fields.
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Envelope<ProfilePayload>>> {
    validate_update(&request)?;

    let updated = db::update_profile(
        &state.pool,
        user.id,
        ProfileUpdate {
            name: request.name.map(|n| n.trim().to_string()),
            bio: request.bio,
            website: request.website,
            avatar: request.avatar,
        },
    )
    .await?;

    tracing::debug!(user_id = %user.id, "profile updated");

    let counts = db::follow_counts(&state.pool, updated.id).await?;
    let posts = crate::posts::db::thumbnails_for_user(&state.pool, updated.id).await?;

    Ok(Json(Envelope::data(profile_payload(
        updated,
        counts.followers,
        counts.following,
        posts,
    ))))
}

/// `POST /api/users/avatar` - multipart avatar image upload.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Json<Envelope<AvatarPayload>>> {
    let form = media::read_form(
        multipart,
        &state.config.upload_dir,
        "avatar",
        media::IMAGE_EXTENSIONS,
    )
    .await?;

    let avatar = form
        .media
        .ok_or_else(|| ApiError::validation("Please upload an image"))?;

    db::set_avatar(&state.pool, user.id, &avatar).await?;
    tracing::debug!(user_id = %user.id, %avatar, "avatar updated");

    Ok(Json(Envelope::data(AvatarPayload { avatar })))
}

/// `POST /api/users/:id/follow`
///
/// Self-follow and double-follow are conflicts; the edge insert itself is
/// a single conflict-aware write.
pub async fn follow_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    if target_id == user.id {
        return Err(ApiError::conflict("You cannot follow yourself"));
    }

    db::find_basic_by_id(&state.pool, target_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let inserted = db::follow(&state.pool, user.id, target_id).await?;
    if !inserted {
        return Err(ApiError::conflict("You are already following this user"));
    }

    tracing::debug!(follower = %user.id, followed = %target_id, "follow edge added");
    Ok(Json(Envelope::message("User followed successfully")))
}

/// `DELETE /api/users/:id/follow` - idempotent edge removal.
pub async fn unfollow_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    db::find_basic_by_id(&state.pool, target_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    db::unfollow(&state.pool, user.id, target_id).await?;
    Ok(Json(Envelope::message("User unfollowed successfully")))
}

/// `GET /api/users/:id/followers`
pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<Vec<FollowerInfo>>>> {
    db::find_basic_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let followers = db::followers_of(&state.pool, user_id).await?;
    Ok(Json(Envelope::data(followers)))
}

/// `GET /api/users/feed/suggestions` - up to five accounts the actor does
/// not follow yet.
pub async fn get_suggestions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Envelope<Vec<SuggestionInfo>>>> {
    let suggestions = db::suggestions(&state.pool, user.id, SUGGESTION_LIMIT).await?;
    Ok(Json(Envelope::data(suggestions)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(
        name: Option<&str>,
        bio: Option<&str>,
        website: Option<&str>,
    ) -> UpdateProfileRequest {
        UpdateProfileRequest {
            name: name.map(String::from),
            bio: bio.map(String::from),
            website: website.map(String::from),
            avatar: None,
        }
    }

    #[test]
    fn partial_update_with_no_fields_is_valid() {
        assert!(validate_update(&update(None, None, None)).is_ok());
    }

    #[test]
    fn update_rejects_blank_name() {
        assert!(validate_update(&update(Some("   "), None, None)).is_err());
    }

    #[test]
    fn update_enforces_length_bounds() {
        assert!(validate_update(&update(Some(&"n".repeat(51)), None, None)).is_err());
        assert!(validate_update(&update(None, Some(&"b".repeat(151)), None)).is_err());
        assert!(validate_update(&update(Some("Ada"), Some("likes math"), Some("https://a.b"))).is_ok());
    }

    #[test]
    fn update_bounds_count_characters_not_bytes() {
        assert!(validate_update(&update(Some(&"ü".repeat(50)), None, None)).is_ok());
        assert!(validate_update(&update(None, Some(&"ü".repeat(150)), None)).is_ok());
        assert!(validate_update(&update(None, Some(&"ü".repeat(151)), None)).is_err());
    }
}
