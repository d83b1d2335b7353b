//! Handlers for `/api/auth`: register, login and current identity.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::sessions::create_token;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::CurrentUser;
use crate::response::Envelope;
use crate::server::state::AppState;
use crate::users::db as users_db;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 6;
pub const NAME_MAX: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload returned by register and login: identity plus a fresh token.
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<i64>,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MePayload {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub bio: String,
    pub website: String,
    pub verified: bool,
    pub is_private: bool,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Usernames are 3-30 characters, start with a letter, and contain only
/// ASCII alphanumerics and underscores.
pub fn is_valid_username(username: &str) -> bool {
    if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
        return false;
    }

    let mut chars = username.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_register(request: &RegisterRequest) -> Result<(), ApiError> {
    if request.username.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
        || request.name.trim().is_empty()
    {
        return Err(ApiError::validation(
            "Please provide username, email, password, and name",
        ));
    }
    if !is_valid_username(request.username.trim()) {
        return Err(ApiError::validation(
            "Username must be 3-30 characters, start with a letter, and contain only letters, numbers, and underscores",
        ));
    }
    if !request.email.contains('@') {
        return Err(ApiError::validation("Please provide a valid email"));
    }
    if request.password.len() < PASSWORD_MIN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }
    if request.name.trim().chars().count() > NAME_MAX {
        return Err(ApiError::validation("Name cannot exceed 50 characters"));
    }
    Ok(())
}

/// `POST /api/auth/register`
///
/// Creates a user and returns a usable session token. Duplicate email or
/// username is a conflict; both fields are stored lowercase.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<AuthPayload>>)> {
    validate_register(&request)?;

    let username = request.username.trim().to_lowercase();
    let email = request.email.trim().to_lowercase();

    if users_db::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }
    if users_db::find_by_username(&state.pool, &username)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("Username already taken"));
    }

    let password_hash = hash(&request.password, DEFAULT_COST)?;
    let avatar = format!("https://i.pravatar.cc/150?u={username}");

    let user = users_db::create_user(
        &state.pool,
        &username,
        &email,
        &password_hash,
        request.name.trim(),
        &avatar,
    )
    .await?;

    tracing::info!(user_id = %user.id, %username, "user registered");

    let token = create_token(&state.config.jwt_secret, user.id, &user.username)
        .map_err(|e| ApiError::Internal(format!("Failed to issue token: {e}")))?;

    let payload = AuthPayload {
        id: user.id,
        username: user.username,
        email: user.email,
        name: user.name,
        avatar: user.avatar,
        bio: None,
        followers: None,
        following: None,
        token,
    };

    Ok((StatusCode::CREATED, Json(Envelope::data(payload))))
}

/// `POST /api/auth/login`
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Envelope<AuthPayload>>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::validation("Please provide email and password"));
    }

    let email = request.email.trim().to_lowercase();
    let user = users_db::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify(&request.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let counts = users_db::follow_counts(&state.pool, user.id).await?;
    let token = create_token(&state.config.jwt_secret, user.id, &user.username)
        .map_err(|e| ApiError::Internal(format!("Failed to issue token: {e}")))?;

    tracing::debug!(user_id = %user.id, "login successful");

    let payload = AuthPayload {
        id: user.id,
        username: user.username,
        email: user.email,
        name: user.name,
        avatar: user.avatar,
        bio: Some(user.bio),
        followers: Some(counts.followers),
        following: Some(counts.following),
        token,
    };

    Ok(Json(Envelope::data(payload)))
}

/// `GET /api/auth/me`
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Envelope<MePayload>>> {
    let record = users_db::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;
    let counts = users_db::follow_counts(&state.pool, record.id).await?;

    Ok(Json(Envelope::data(MePayload {
        id: record.id,
        username: record.username,
        email: record.email,
        name: record.name,
        avatar: record.avatar,
        bio: record.bio,
        website: record.website,
        verified: record.verified,
        is_private: record.is_private,
        followers_count: counts.followers,
        following_count: counts.following,
        created_at: record.created_at,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn valid_usernames() {
        assert!(is_valid_username("ada"));
        assert!(is_valid_username("ada_lovelace_99"));
        assert!(is_valid_username(&"a".repeat(30)));
    }

    #[test]
    fn invalid_usernames() {
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username(&"a".repeat(31)));
        assert!(!is_valid_username("1ada"));
        assert!(!is_valid_username("_ada"));
        assert!(!is_valid_username("ada lovelace"));
        assert!(!is_valid_username("ada!"));
    }

    #[test]
    fn register_requires_all_fields() {
        let err = validate_register(&request("", "a@b.c", "secret1", "Ada")).unwrap_err();
        assert!(err.to_string().contains("provide username"));

        let err = validate_register(&request("ada", "a@b.c", "", "Ada")).unwrap_err();
        assert!(err.to_string().contains("provide username"));
    }

    #[test]
    fn register_rejects_bad_fields() {
        assert!(validate_register(&request("ada", "not-an-email", "secret1", "Ada")).is_err());
        assert!(validate_register(&request("ada", "a@b.c", "short", "Ada")).is_err());
        assert!(validate_register(&request("ada", "a@b.c", "secret1", &"n".repeat(51))).is_err());
    }

    #[test]
    fn register_accepts_valid_input() {
        assert!(validate_register(&request("ada", "ada@example.com", "secret1", "Ada")).is_ok());
    }

    #[test]
    fn name_bound_counts_characters_not_bytes() {
        assert!(validate_register(&request("ada", "a@b.c", "secret1", &"é".repeat(50))).is_ok());
        assert!(validate_register(&request("ada", "a@b.c", "secret1", &"é".repeat(51))).is_err());
    }
}
