//! The JSON response envelope shared by every endpoint.
//!
//! Successful responses are `{success: true, data, pagination?}` or
//! `{success: true, message}`; failures are produced by
//! [`crate::error::ApiError`] with the same shape.

use serde::Serialize;

/// Pagination block attached to list responses. Pages are 1-indexed.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub pages: i64,
    pub total: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            pages: page_count(total, limit),
            total,
        }
    }
}

/// Number of pages needed to hold `total` items at `limit` per page.
pub fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// The response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    /// Successful response carrying `data`.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    /// Successful response carrying a page of `data` plus pagination.
    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: Some(pagination),
        }
    }
}

impl Envelope<()> {
    /// Successful response carrying only a human-readable message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn data_envelope_omits_message_and_pagination() {
        let value = serde_json::to_value(Envelope::data(vec![1, 2, 3])).unwrap();
        assert_eq!(value, json!({"success": true, "data": [1, 2, 3]}));
    }

    #[test]
    fn message_envelope_omits_data() {
        let value = serde_json::to_value(Envelope::message("User followed successfully")).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "message": "User followed successfully"})
        );
    }

    #[test]
    fn paginated_envelope_includes_all_fields() {
        let value = serde_json::to_value(Envelope::paginated(
            vec!["a"],
            Pagination::new(2, 10, 25),
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "data": ["a"],
                "pagination": {"page": 2, "pages": 3, "total": 25}
            })
        );
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(25, 12), 3);
        assert_eq!(page_count(5, 0), 0);
    }
}
