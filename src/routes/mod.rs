//! API route handlers, one module per entity.

use crate::error::ApiError;

pub mod analytics;
pub mod categories;
pub mod health;
pub mod news;
pub mod news_main;
pub mod posts;
pub mod users;

/// Parse a boolean query flag the permissive way the public API always has:
/// "1", "true" and "yes" (any case) are true, anything else false, absent
/// falls back to the endpoint default.
pub(crate) fn flag(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => default,
    }
}

/// Map a delete-statement result onto the API contract: zero rows touched
/// means the id was already gone, which is a 404 even on repeat deletes.
pub(crate) fn deleted_or_not_found(rows_affected: u64, message: &str) -> Result<(), ApiError> {
    if rows_affected == 0 {
        return Err(ApiError::NotFound(message.to_string()));
    }
    Ok(())
}

/// ILIKE pattern for a free-text filter, `None` when the filter is empty.
pub(crate) fn like_pattern(q: Option<&str>) -> Option<String> {
    let q = q?.trim();
    if q.is_empty() {
        None
    } else {
        Some(format!("%{q}%"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(flag(Some("true"), false));
        assert!(flag(Some("1"), false));
        assert!(flag(Some("YES"), false));
        assert!(!flag(Some("false"), true));
        assert!(!flag(Some("0"), true));
        assert!(flag(None, true));
        assert!(!flag(None, false));
    }

    #[test]
    fn test_repeat_delete_maps_zero_rows_to_not_found() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        assert!(deleted_or_not_found(1, "post_id not found.").is_ok());

        // Second delete on an already-removed id touches zero rows.
        let err = deleted_or_not_found(0, "post_id not found.").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_like_pattern_trims_and_wraps() {
        assert_eq!(like_pattern(Some(" beltline ")).as_deref(), Some("%beltline%"));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
