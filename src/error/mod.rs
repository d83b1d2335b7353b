//! Error handling for the API.
//!
//! All handlers return [`ApiResult`], and every failure surfaces to the
//! client as a `{success: false, message}` envelope with the status code
//! determined by the [`ApiError`] variant.

mod types;

pub use types::{ApiError, ApiResult};
