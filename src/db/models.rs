//! Row structs for the relational store (sqlx + serde).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Blog category row. Owns zero or more posts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlogCategory {
    pub blog_cat_id: i32,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MyUser {
    pub my_user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub zip_code: String,
    pub city_state: Option<String>,
    pub image: String,
    /// Credential hash; written by the account tooling, never serialized.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post row. `content_mongo_id` is the opaque reference into the document
/// content store; null until content is first written.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlogPost {
    pub post_id: i32,
    pub title: String,
    pub slug: String,
    pub blog_cat_id: i32,
    pub author_id: i32,
    pub image: String,
    pub content_mongo_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Marker row promoting a post into the news feed. Primary key equals the
/// post id; cascade-deletes with the post.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsPost {
    pub post_id: i32,
}

/// Dated window during which a news post is the featured lead story.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsMain {
    pub news_main_id: i32,
    pub post_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-post engagement counters, one-to-one with the post.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlogAnalytics {
    pub post_id: i32,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the pre-aggregated most-read report views.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MostReadRow {
    pub post_id: i32,
    pub title: String,
    pub slug: String,
    pub blog_cat_id: i32,
    pub author_id: i32,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}
