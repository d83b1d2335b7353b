//! Multipart upload handling.
//!
//! Uploaded files land in the configured upload directory under a
//! generated name and are served back by path under `/uploads`. Endpoints
//! also accept a plain URL in the media field, in which case nothing is
//! written to disk.

use std::collections::HashMap;
use std::path::Path;

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::server::state::AppState;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
pub const STORY_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "mp4", "mov"];

/// Result of draining a multipart form: the resolved media reference (a
/// `/uploads/...` path or a passthrough URL) plus any text fields.
#[derive(Debug, Default)]
pub struct MediaForm {
    pub media: Option<String>,
    pub fields: HashMap<String, String>,
}

impl MediaForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Lowercased extension of `filename` if it is in the allowed set.
pub fn allowed_extension(filename: &str, allowed: &[&str]) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}

/// Write uploaded bytes under a generated name, returning the served path.
pub async fn store_file(
    dir: &Path,
    prefix: &str,
    original_name: &str,
    allowed: &[&str],
    data: &[u8],
) -> ApiResult<String> {
    let ext = allowed_extension(original_name, allowed).ok_or_else(|| {
        ApiError::validation(if allowed.contains(&"mp4") {
            "Only images and videos are allowed"
        } else {
            "Only images are allowed"
        })
    })?;

    let filename = format!("{prefix}-{}.{ext}", Uuid::new_v4());
    tokio::fs::write(dir.join(&filename), data).await?;

    Ok(format!("/uploads/{filename}"))
}

/// Drain a multipart form.
///
/// A part carrying a filename is stored as the media file; a text part
/// named `image` or `avatar` is taken as a passthrough media URL; all
/// other text parts are collected as fields.
pub async fn read_form(
    mut multipart: Multipart,
    dir: &Path,
    prefix: &str,
    allowed: &[&str],
) -> ApiResult<MediaForm> {
    let mut form = MediaForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(String::from) {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;
            form.media = Some(store_file(dir, prefix, &filename, allowed, &data).await?);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::validation(format!("Invalid field '{name}': {e}")))?;

            if (name == "image" || name == "avatar") && !value.trim().is_empty() {
                form.media = Some(value.trim().to_string());
            } else {
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Read media form data out of a request that may be either multipart
/// (file upload or URL field) or a plain JSON body with string fields.
pub async fn read_request(
    request: Request,
    state: &AppState,
    prefix: &str,
    allowed: &[&str],
) -> ApiResult<MediaForm> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::validation(format!("Invalid multipart request: {e}")))?;
        read_form(multipart, &state.config.upload_dir, prefix, allowed).await
    } else {
        let axum::Json(value) = axum::Json::<serde_json::Value>::from_request(request, state)
            .await
            .map_err(|e| ApiError::validation(format!("Invalid request body: {e}")))?;
        Ok(form_from_json(&value))
    }
}

fn form_from_json(value: &serde_json::Value) -> MediaForm {
    let mut form = MediaForm::default();
    if let Some(object) = value.as_object() {
        for (name, value) in object {
            if let Some(text) = value.as_str() {
                if name == "image" && !text.trim().is_empty() {
                    form.media = Some(text.trim().to_string());
                } else {
                    form.fields.insert(name.clone(), text.to_string());
                }
            }
        }
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_known_image_extensions() {
        assert_eq!(allowed_extension("photo.jpg", IMAGE_EXTENSIONS).as_deref(), Some("jpg"));
        assert_eq!(allowed_extension("photo.JPEG", IMAGE_EXTENSIONS).as_deref(), Some("jpeg"));
        assert_eq!(allowed_extension("a.b.webp", IMAGE_EXTENSIONS).as_deref(), Some("webp"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert_eq!(allowed_extension("script.exe", IMAGE_EXTENSIONS), None);
        assert_eq!(allowed_extension("noextension", IMAGE_EXTENSIONS), None);
        assert_eq!(allowed_extension("clip.mp4", IMAGE_EXTENSIONS), None);
    }

    #[test]
    fn stories_accept_video_extensions() {
        assert_eq!(allowed_extension("clip.mp4", STORY_EXTENSIONS).as_deref(), Some("mp4"));
        assert_eq!(allowed_extension("clip.MOV", STORY_EXTENSIONS).as_deref(), Some("mov"));
    }

    #[test]
    fn json_body_maps_image_and_fields() {
        let form = form_from_json(&json!({
            "image": "https://example.com/cat.jpg",
            "caption": "hello",
            "location": "Paris",
            "count": 3
        }));
        assert_eq!(form.media.as_deref(), Some("https://example.com/cat.jpg"));
        assert_eq!(form.field("caption"), Some("hello"));
        assert_eq!(form.field("location"), Some("Paris"));
        assert_eq!(form.field("count"), None);
    }

    #[test]
    fn json_body_without_image_has_no_media() {
        let form = form_from_json(&json!({"image": "   ", "caption": "x"}));
        assert_eq!(form.media, None);

        let form = form_from_json(&json!({"caption": "x"}));
        assert_eq!(form.media, None);
    }

    #[tokio::test]
    async fn store_file_writes_under_generated_name() {
        let dir = std::env::temp_dir().join(format!("photogram-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let url = store_file(&dir, "post", "cat.PNG", IMAGE_EXTENSIONS, b"not-really-a-png")
            .await
            .unwrap();

        let filename = url.strip_prefix("/uploads/").unwrap();
        assert!(filename.starts_with("post-"));
        assert!(filename.ends_with(".png"));

        let stored = tokio::fs::read(dir.join(filename)).await.unwrap();
        assert_eq!(stored, b"not-really-a-png");

        tokio::fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn store_file_rejects_disallowed_extension() {
        let dir = std::env::temp_dir();
        let err = store_file(&dir, "avatar", "payload.svg", IMAGE_EXTENSIONS, b"<svg/>")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Only images are allowed"));
    }
}
