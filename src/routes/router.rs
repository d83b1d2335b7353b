//! Router assembly.
//!
//! Routes are split into three groups by their authentication contract:
//! public, optional-auth (identity attached when a valid token is
//! present) and protected (requests without a valid token are rejected
//! before the handler runs). `DELETE /api/posts/{id}` lives in the
//! optional group because it shares a path with the public single-post
//! read; its handler still demands an identity through the extractor.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::auth::handlers as auth;
use crate::middleware::auth::{optional_auth, require_auth};
use crate::posts::handlers as posts;
use crate::server::state::AppState;
use crate::stories::handlers as stories;
use crate::users::handlers as users;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/users/{username}", get(users::get_profile))
        .route("/api/users/{id}/followers", get(users::get_followers));

    let optional = Router::new()
        .route("/api/posts/explore", get(posts::get_explore))
        .route(
            "/api/posts/{id}",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth,
        ));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::get_me))
        .route("/api/users/profile", put(users::update_profile))
        .route("/api/users/avatar", post(users::upload_avatar))
        .route(
            "/api/users/{id}/follow",
            post(users::follow_user).delete(users::unfollow_user),
        )
        .route("/api/users/feed/suggestions", get(users::get_suggestions))
        .route("/api/posts", get(posts::get_feed).post(posts::create_post))
        .route("/api/posts/{id}/like", post(posts::toggle_like))
        .route("/api/posts/{id}/save", post(posts::toggle_save))
        .route("/api/posts/{id}/comment", post(posts::add_comment))
        .route(
            "/api/posts/{post_id}/comment/{comment_id}",
            axum::routing::delete(posts::delete_comment),
        )
        .route(
            "/api/stories",
            get(stories::list_stories).post(stories::create_story),
        )
        .route(
            "/api/stories/{id}",
            get(stories::view_story).delete(stories::delete_story),
        )
        .route("/api/stories/{id}/viewers", get(stories::list_viewers))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public)
        .merge(optional)
        .merge(protected)
        .nest_service(
            "/uploads",
            ServeDir::new(state.config.upload_dir.clone()),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Photogram API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
