//! Handlers for `/api/posts`: feed, explore, creation, engagement and
//! comments.

use std::collections::HashMap;

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::media;
use crate::middleware::auth::{CurrentUser, MaybeUser};
use crate::posts::db::{self, CommentRow, PostRow, ReplyRow};
use crate::response::{Envelope, Pagination};
use crate::server::state::AppState;

const FEED_DEFAULT_LIMIT: i64 = 10;
const EXPLORE_DEFAULT_LIMIT: i64 = 12;
const MAX_LIMIT: i64 = 50;
const FEED_COMMENT_PREVIEW: i64 = 2;
const CAPTION_MAX: usize = 2200;
const LOCATION_MAX: usize = 100;
const COMMENT_MAX: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: String,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentAuthorView {
    pub id: Uuid,
    pub username: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub user: CommentAuthorView,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub user: CommentAuthorView,
    pub likes_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<ReplyView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub image: String,
    pub caption: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub user: AuthorView,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub is_saved: bool,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
pub struct LikePayload {
    pub is_liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SavePayload {
    pub is_saved: bool,
}

/// Normalize query parameters into `(page, limit, offset)` with a
/// 1-indexed page.
fn paging(query: &PageQuery, default_limit: i64) -> (i64, i64, i64) {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
    // A page number near i64::MAX must not wrap the offset negative.
    let offset = (page - 1).saturating_mul(limit);
    (page, limit, offset)
}

fn comment_view(row: CommentRow, replies: Vec<ReplyView>) -> CommentView {
    CommentView {
        id: row.id,
        post_id: row.post_id,
        text: row.text,
        created_at: row.created_at,
        user: CommentAuthorView {
            id: row.user_id,
            username: row.author_username,
            avatar: row.author_avatar,
        },
        likes_count: row.likes_count,
        replies,
    }
}

fn reply_view(row: ReplyRow) -> ReplyView {
    ReplyView {
        id: row.id,
        text: row.text,
        created_at: row.created_at,
        user: CommentAuthorView {
            id: row.user_id,
            username: row.author_username,
            avatar: row.author_avatar,
        },
    }
}

fn post_view(row: PostRow, comments: Vec<CommentView>) -> PostView {
    PostView {
        id: row.id,
        image: row.image,
        caption: row.caption,
        location: row.location,
        created_at: row.created_at,
        user: AuthorView {
            id: row.user_id,
            username: row.author_username,
            name: row.author_name,
            avatar: row.author_avatar,
            verified: row.author_verified,
        },
        likes_count: row.likes_count,
        comments_count: row.comments_count,
        is_liked: row.is_liked,
        is_saved: row.is_saved,
        comments,
    }
}

/// Join a page of posts with their preview comments, preserving post
/// order.
fn attach_previews(posts: Vec<PostRow>, comments: Vec<CommentRow>) -> Vec<PostView> {
    let mut by_post: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for comment in comments {
        by_post
            .entry(comment.post_id)
            .or_default()
            .push(comment_view(comment, Vec::new()));
    }

    posts
        .into_iter()
        .map(|post| {
            let previews = by_post.remove(&post.id).unwrap_or_default();
            post_view(post, previews)
        })
        .collect()
}

/// `GET /api/posts` - the following-scoped feed.
pub async fn get_feed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<PostView>>>> {
    let (page, limit, offset) = paging(&query, FEED_DEFAULT_LIMIT);

    let posts = db::feed_page(&state.pool, user.id, limit, offset).await?;
    let total = db::feed_total(&state.pool, user.id).await?;

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let previews = if post_ids.is_empty() {
        Vec::new()
    } else {
        db::recent_comments(&state.pool, &post_ids, FEED_COMMENT_PREVIEW).await?
    };

    Ok(Json(Envelope::paginated(
        attach_previews(posts, previews),
        Pagination::new(page, limit, total),
    )))
}

/// `GET /api/posts/explore` - global feed, most liked first. Anonymous
/// viewers get `is_liked`/`is_saved` as false.
pub async fn get_explore(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Envelope<Vec<PostView>>>> {
    let (page, limit, offset) = paging(&query, EXPLORE_DEFAULT_LIMIT);

    let posts = db::explore_page(&state.pool, viewer.id(), limit, offset).await?;
    let total = db::explore_total(&state.pool).await?;

    let views = posts.into_iter().map(|p| post_view(p, Vec::new())).collect();
    Ok(Json(Envelope::paginated(
        views,
        Pagination::new(page, limit, total),
    )))
}

// Bounds are in characters, not bytes; multibyte text at the limit is
// still valid.
fn validate_post_fields(caption: &str, location: &str) -> Result<(), ApiError> {
    if caption.chars().count() > CAPTION_MAX {
        return Err(ApiError::validation("Caption cannot exceed 2200 characters"));
    }
    if location.chars().count() > LOCATION_MAX {
        return Err(ApiError::validation("Location cannot exceed 100 characters"));
    }
    Ok(())
}

/// `POST /api/posts` - create a post from a multipart upload or a JSON
/// body carrying an image URL.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    request: Request,
) -> ApiResult<(StatusCode, Json<Envelope<PostView>>)> {
    let form = media::read_request(request, &state, "post", media::IMAGE_EXTENSIONS).await?;

    let image = form
        .media
        .clone()
        .ok_or_else(|| ApiError::validation("Image is required"))?;
    let caption = form.field("caption").unwrap_or_default().to_string();
    let location = form.field("location").unwrap_or_default().to_string();
    validate_post_fields(&caption, &location)?;

    let post_id = db::create_post(&state.pool, user.id, &image, &caption, &location).await?;
    tracing::info!(%post_id, user_id = %user.id, "post created");

    let row = db::find_post(&state.pool, post_id, Some(user.id))
        .await?
        .ok_or_else(|| ApiError::Internal("Created post vanished".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(post_view(row, Vec::new()))),
    ))
}

/// `GET /api/posts/:id` - single post with its full comment thread.
pub async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<PostView>>> {
    let row = db::find_post(&state.pool, post_id, viewer.id())
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let comments = db::comments_for_post(&state.pool, post_id).await?;
    let comment_ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
    let replies = if comment_ids.is_empty() {
        Vec::new()
    } else {
        db::replies_for_comments(&state.pool, &comment_ids).await?
    };

    let mut replies_by_comment: HashMap<Uuid, Vec<ReplyView>> = HashMap::new();
    for reply in replies {
        replies_by_comment
            .entry(reply.comment_id)
            .or_default()
            .push(reply_view(reply));
    }

    let comment_views = comments
        .into_iter()
        .map(|c| {
            let replies = replies_by_comment.remove(&c.id).unwrap_or_default();
            comment_view(c, replies)
        })
        .collect();

    Ok(Json(Envelope::data(post_view(row, comment_views))))
}

/// `DELETE /api/posts/:id` - owner-only; cascades to comments inside one
/// transaction.
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<()>>> {
    let owner = db::post_owner(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if owner != user.id {
        return Err(ApiError::forbidden("Not authorized to delete this post"));
    }

    db::delete_post(&state.pool, post_id).await?;
    tracing::info!(%post_id, user_id = %user.id, "post deleted");

    Ok(Json(Envelope::message("Post deleted successfully")))
}

/// `POST /api/posts/:id/like` - toggle; returns the new state and count.
pub async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<LikePayload>>> {
    db::post_owner(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let (is_liked, likes_count) = db::toggle_like(&state.pool, post_id, user.id).await?;

    Ok(Json(Envelope::data(LikePayload {
        is_liked,
        likes_count,
    })))
}

/// `POST /api/posts/:id/save` - toggle private bookmark membership.
pub async fn toggle_save(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Envelope<SavePayload>>> {
    db::post_owner(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let is_saved = db::toggle_save(&state.pool, post_id, user.id).await?;
    Ok(Json(Envelope::data(SavePayload { is_saved })))
}

/// `POST /api/posts/:id/comment`
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<CommentView>>)> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::validation("Comment text is required"));
    }
    if text.chars().count() > COMMENT_MAX {
        return Err(ApiError::validation("Comment cannot exceed 1000 characters"));
    }

    db::post_owner(&state.pool, post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    let comment = db::insert_comment(&state.pool, user.id, post_id, text).await?;
    tracing::debug!(comment_id = %comment.id, %post_id, "comment added");

    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(comment_view(comment, Vec::new()))),
    ))
}

/// `DELETE /api/posts/:postId/comment/:commentId` - author-only; never
/// touches the parent post.
pub async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Envelope<()>>> {
    let comment = db::find_comment(&state.pool, comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    if comment.user_id != user.id {
        return Err(ApiError::forbidden("Not authorized to delete this comment"));
    }

    db::delete_comment(&state.pool, comment_id).await?;
    Ok(Json(Envelope::message("Comment deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query(page: Option<i64>, limit: Option<i64>) -> PageQuery {
        PageQuery { page, limit }
    }

    fn post_row(id: Uuid, author: &str) -> PostRow {
        PostRow {
            id,
            user_id: Uuid::new_v4(),
            image: "/uploads/a.jpg".into(),
            caption: String::new(),
            location: String::new(),
            created_at: Utc::now(),
            author_username: author.into(),
            author_name: author.into(),
            author_avatar: String::new(),
            author_verified: false,
            likes_count: 0,
            comments_count: 0,
            is_liked: false,
            is_saved: false,
        }
    }

    fn comment_row(post_id: Uuid, text: &str) -> CommentRow {
        CommentRow {
            id: Uuid::new_v4(),
            post_id,
            user_id: Uuid::new_v4(),
            text: text.into(),
            created_at: Utc::now(),
            author_username: "bob".into(),
            author_avatar: String::new(),
            likes_count: 0,
        }
    }

    #[test]
    fn paging_defaults_and_offsets() {
        assert_eq!(paging(&query(None, None), 10), (1, 10, 0));
        assert_eq!(paging(&query(Some(3), None), 10), (3, 10, 20));
        assert_eq!(paging(&query(Some(2), Some(5)), 10), (2, 5, 5));
    }

    #[test]
    fn paging_clamps_hostile_input() {
        assert_eq!(paging(&query(Some(0), Some(-1)), 10), (1, 1, 0));
        assert_eq!(paging(&query(Some(-7), Some(9999)), 10), (1, MAX_LIMIT, 0));
    }

    #[test]
    fn paging_saturates_on_huge_page_numbers() {
        let (page, limit, offset) = paging(&query(Some(i64::MAX), None), 10);
        assert_eq!(page, i64::MAX);
        assert_eq!(limit, 10);
        assert_eq!(offset, i64::MAX);

        let (_, _, offset) = paging(&query(Some(i64::MAX), Some(MAX_LIMIT)), 10);
        assert!(offset >= 0);
    }

    #[test]
    fn previews_attach_to_their_posts_in_order() {
        let a = post_row(Uuid::new_v4(), "ada");
        let b = post_row(Uuid::new_v4(), "bob");
        let comments = vec![
            comment_row(b.id, "on b"),
            comment_row(a.id, "first on a"),
            comment_row(a.id, "second on a"),
        ];

        let views = attach_previews(vec![a.clone(), b.clone()], comments);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, a.id);
        assert_eq!(views[0].comments.len(), 2);
        assert_eq!(views[0].comments[0].text, "first on a");
        assert_eq!(views[1].id, b.id);
        assert_eq!(views[1].comments.len(), 1);
    }

    #[test]
    fn posts_without_comments_get_empty_previews() {
        let a = post_row(Uuid::new_v4(), "ada");
        let views = attach_previews(vec![a], Vec::new());
        assert!(views[0].comments.is_empty());
    }

    #[test]
    fn post_field_bounds() {
        assert!(validate_post_fields("hi", "Paris").is_ok());
        assert!(validate_post_fields(&"c".repeat(2201), "").is_err());
        assert!(validate_post_fields("", &"l".repeat(101)).is_err());
    }

    #[test]
    fn post_field_bounds_count_characters_not_bytes() {
        assert!(validate_post_fields(&"é".repeat(2200), "").is_ok());
        assert!(validate_post_fields(&"é".repeat(2201), "").is_err());
        assert!(validate_post_fields("", &"東".repeat(100)).is_ok());
    }
}
