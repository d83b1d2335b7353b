//! Handlers for `/api/stories`.

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::media;
use crate::middleware::auth::CurrentUser;
use crate::posts::handlers::AuthorView;
use crate::response::Envelope;
use crate::server::state::AppState;
use crate::stories::db::{self, StoryRow, ViewerInfo};
use crate::stories::groups::{group_by_author, StoryGroup};

/// A single story with its author, as returned by create and view.
#[derive(Debug, Serialize)]
pub struct StoryPayload {
    pub id: Uuid,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user: AuthorView,
    pub is_viewed: bool,
    pub viewers_count: i64,
}

fn story_payload(row: StoryRow) -> StoryPayload {
    StoryPayload {
        id: row.id,
        image: row.image,
        created_at: row.created_at,
        expires_at: row.expires_at,
        user: AuthorView {
            id: row.user_id,
            username: row.author_username,
            name: row.author_name,
            avatar: row.author_avatar,
            verified: row.author_verified,
        },
        is_viewed: row.is_viewed,
        viewers_count: row.viewers_count,
    }
}

/// `GET /api/stories` - active stories of self + followed users, grouped
/// by author. Own group first, others by most recent story.
pub async fn list_stories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Envelope<Vec<StoryGroup>>>> {
    let rows = db::active_for_actor(&state.pool, user.id).await?;
    Ok(Json(Envelope::data(group_by_author(rows, user.id))))
}

/// `POST /api/stories` - create a story; expiry is fixed at creation
/// time plus 24 hours.
pub async fn create_story(
    State(state): State<AppState>,
    user: CurrentUser,
    request: Request,
) -> ApiResult<(StatusCode, Json<Envelope<StoryPayload>>)> {
    let form = media::read_request(request, &state, "story", media::STORY_EXTENSIONS).await?;

    let image = form
        .media
        .ok_or_else(|| ApiError::validation("Image is required"))?;

    let story_id = db::create_story(&state.pool, user.id, &image).await?;
    tracing::info!(%story_id, user_id = %user.id, "story created");

    let row = db::find_active(&state.pool, story_id, user.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Created story vanished".into()))?;

    Ok((StatusCode::CREATED, Json(Envelope::data(story_payload(row)))))
}

/// `GET /api/stories/:id` - view a story, marking the viewer exactly
/// once. An expired story is not found even if it has not been swept yet.
pub async fn view_story(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<StoryPayload>>> {
    let row = db::find_active(&state.pool, story_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Story not found or expired"))?;

    let newly_viewed = db::mark_viewed(&state.pool, story_id, user.id).await?;

    let mut payload = story_payload(row);
    payload.is_viewed = true;
    if newly_viewed {
        payload.viewers_count += 1;
    }

    Ok(Json(Envelope::data(payload)))
}

/// `DELETE /api/stories/:id` - owner-only early removal.
pub async fn delete_story(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    let row = db::find_active(&state.pool, story_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Story not found"))?;

    if row.user_id != user.id {
        return Err(ApiError::forbidden("Not authorized to delete this story"));
    }

    db::delete_story(&state.pool, story_id).await?;
    tracing::info!(%story_id, user_id = %user.id, "story deleted");

    Ok(Json(Envelope::message("Story deleted successfully")))
}

/// `GET /api/stories/:id/viewers` - owner-only viewer identities.
pub async fn list_viewers(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<Vec<ViewerInfo>>>> {
    let row = db::find_active(&state.pool, story_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Story not found"))?;

    if row.user_id != user.id {
        return Err(ApiError::forbidden("Only the story owner can view viewers"));
    }

    let viewers = db::viewers(&state.pool, story_id).await?;
    Ok(Json(Envelope::data(viewers)))
}
