//! Read Composer - assembles the response shape every list/detail endpoint
//! returns.
//!
//! Fixed rules:
//! - the raw content reference never appears in list views, and on detail
//!   views only when explicitly requested;
//! - absent content omits the `content` key entirely (never null, never an
//!   error);
//! - requested analytics fall back to zero-filled counters when no row
//!   exists;
//! - every post view carries a derived `media_url`;
//! - list endpoints use the `{items, page, per_page, total, pages}` envelope
//!   and an out-of-range page yields empty items with correct totals.

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::models::{BlogAnalytics, BlogPost};
use crate::error::ApiError;
use crate::state::AppState;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const REPORT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 100;
pub const DEFAULT_RELATED_LIMIT: i64 = 5;

/// Normalized paging inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub per_page: i64,
}

impl Paging {
    /// Clamp caller-supplied values; out-of-range pages are legal and simply
    /// select past the end of the table.
    pub fn clamp(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Saturating so an absurd `page` selects past the end of the table
    /// instead of overflowing into a negative OFFSET.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Total page count for the envelope.
pub fn page_count(total: i64, per_page: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

/// Pagination envelope shared by every list endpoint.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, paging: Paging, total: i64) -> Self {
        Self {
            items,
            page: paging.page,
            per_page: paging.per_page,
            total,
            pages: page_count(total, paging.per_page),
        }
    }
}

/// The four engagement counters; defaults are the zero-filled fallback.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct AnalyticsCounters {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

impl From<&BlogAnalytics> for AnalyticsCounters {
    fn from(row: &BlogAnalytics) -> Self {
        Self {
            views: row.views,
            likes: row.likes,
            comments: row.comments,
            shares: row.shares,
        }
    }
}

/// Expansion flags for a post-shaped response.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    pub include_content: bool,
    pub include_analytics: bool,
    /// Detail views only; list views always hide the internal reference.
    pub include_content_ref: bool,
}

impl ViewOptions {
    pub fn list_defaults() -> Self {
        Self {
            include_content: true,
            ..Self::default()
        }
    }
}

/// Composed post response item.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub post_id: i32,
    pub title: String,
    pub slug: String,
    pub blog_cat_id: i32,
    pub author_id: i32,
    pub image: String,
    /// Browser-usable URL derived from `image`; null when no media exists.
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_mongo_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsCounters>,
}

/// Absolute/browser-usable URL for a raw media reference.
pub fn media_url(base: &str, image: &str) -> Option<String> {
    let image = image.trim();
    if image.is_empty() {
        return None;
    }
    if image.starts_with("http://") || image.starts_with("https://") {
        return Some(image.to_string());
    }
    Some(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        image.trim_start_matches('/')
    ))
}

/// Counters for a post, zero-filled when no analytics row exists.
pub async fn analytics_for(pool: &PgPool, post_id: i32) -> Result<AnalyticsCounters, ApiError> {
    let row = sqlx::query_as::<_, BlogAnalytics>(
        "SELECT post_id, views, likes, comments, shares, created_at, updated_at
         FROM blog_analytics WHERE post_id = $1",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(AnalyticsCounters::from).unwrap_or_default())
}

/// Assemble the response item for one post.
///
/// `preloaded_content` short-circuits the store fetch when the caller just
/// wrote the body and still holds it (create/update echo paths).
pub async fn compose_post(
    state: &AppState,
    post: &BlogPost,
    options: ViewOptions,
    preloaded_content: Option<Value>,
) -> Result<PostView, ApiError> {
    let content = if options.include_content {
        match preloaded_content {
            Some(content) => Some(content),
            None => state.content.resolve(post.content_mongo_id.as_deref()).await,
        }
    } else {
        None
    };

    let analytics = if options.include_analytics {
        Some(analytics_for(&state.db, post.post_id).await?)
    } else {
        None
    };

    Ok(PostView {
        post_id: post.post_id,
        title: post.title.clone(),
        slug: post.slug.clone(),
        blog_cat_id: post.blog_cat_id,
        author_id: post.author_id,
        image: post.image.clone(),
        media_url: media_url(&state.media_base_url, &post.image),
        content_mongo_id: if options.include_content_ref {
            post.content_mongo_id.clone()
        } else {
            None
        },
        created_at: post.created_at,
        updated_at: post.updated_at,
        content,
        analytics,
    })
}

/// Compose a list page; store calls run sequentially per item.
pub async fn compose_posts(
    state: &AppState,
    posts: &[BlogPost],
    options: ViewOptions,
) -> Result<Vec<PostView>, ApiError> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        views.push(compose_post(state, post, options, None).await?);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use chrono::Utc;
    use serde_json::json;

    fn sample_post(content_ref: Option<&str>) -> BlogPost {
        BlogPost {
            post_id: 7,
            title: "Beltline Update".to_string(),
            slug: "beltline-update".to_string(),
            blog_cat_id: 1,
            author_id: 2,
            image: "beltline.jpg".to_string(),
            content_mongo_id: content_ref.map(|s| s.to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_paging_clamps_inputs() {
        let paging = Paging::clamp(None, None, DEFAULT_PER_PAGE);
        assert_eq!(paging, Paging { page: 1, per_page: 20 });

        let paging = Paging::clamp(Some(-3), Some(500), DEFAULT_PER_PAGE);
        assert_eq!(paging, Paging { page: 1, per_page: MAX_PER_PAGE });

        let paging = Paging::clamp(Some(9999), Some(20), DEFAULT_PER_PAGE);
        assert_eq!(paging.offset(), 9998 * 20);
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let paging = Paging::clamp(Some(i64::MAX), Some(100), DEFAULT_PER_PAGE);
        assert_eq!(paging.offset(), i64::MAX);
        assert!(paging.offset() > 0);
    }

    #[test]
    fn test_page_count_math() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(3, 20), 1);
    }

    #[test]
    fn test_out_of_range_page_keeps_totals() {
        let paging = Paging::clamp(Some(9999), Some(20), DEFAULT_PER_PAGE);
        let page: Page<i32> = Page::new(vec![], paging, 3);
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_media_url_derivation() {
        assert_eq!(
            media_url("/static/uploads", "beltline.jpg").as_deref(),
            Some("/static/uploads/beltline.jpg")
        );
        assert_eq!(
            media_url("/static/uploads/", "/beltline.jpg").as_deref(),
            Some("/static/uploads/beltline.jpg")
        );
        assert_eq!(
            media_url("/static/uploads", "https://cdn.example.com/x.jpg").as_deref(),
            Some("https://cdn.example.com/x.jpg")
        );
        assert_eq!(media_url("/static/uploads", "  "), None);
    }

    #[test]
    fn test_zero_counters_serialize_fully() {
        let json = serde_json::to_value(AnalyticsCounters::default()).unwrap();
        assert_eq!(
            json,
            json!({"views": 0, "likes": 0, "comments": 0, "shares": 0})
        );
    }

    #[tokio::test]
    async fn test_compose_hides_ref_and_omits_absent_content() {
        let state = test_state();
        let post = sample_post(Some("dangling-ref-to-nothing"));

        let view = compose_post(&state, &post, ViewOptions::list_defaults(), None)
            .await
            .unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("content_mongo_id").is_none());
        assert!(json.get("content").is_none());
        assert_eq!(json["media_url"], "/static/uploads/beltline.jpg");
    }

    #[tokio::test]
    async fn test_compose_returns_staged_content() {
        let state = test_state();
        let body = json!({"section_1_title": "Hello"});
        let content_ref = state.content.create(&body).await.unwrap();
        let post = sample_post(Some(&content_ref));

        let options = ViewOptions {
            include_content: true,
            include_analytics: false,
            include_content_ref: true,
        };
        let view = compose_post(&state, &post, options, None).await.unwrap();
        assert_eq!(view.content, Some(body));
        assert_eq!(view.content_mongo_id.as_deref(), Some(content_ref.as_str()));

        let view = compose_post(
            &state,
            &post,
            ViewOptions {
                include_content: false,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
        assert_eq!(view.content, None);
    }
}
