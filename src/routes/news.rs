//! News marker rows - one-to-one extensions promoting a post into the news
//! feed. The row carries no fields of its own, so responses are always the
//! composed base post.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::compose::{compose_post, compose_posts, Page, Paging, ViewOptions, DEFAULT_PER_PAGE};
use crate::db::models::{BlogPost, NewsPost};
use crate::error::ApiError;
use crate::routes::posts::{fetch_post, POST_COLUMNS};
use crate::routes::{deleted_or_not_found, flag};
use crate::state::AppState;
use crate::validation::NewsPayload;

#[derive(Debug, Deserialize)]
pub struct NewsListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub include_content: Option<String>,
    pub include_analytics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsDetailQuery {
    pub include_content: Option<String>,
    pub include_analytics: Option<String>,
    pub include_content_ref: Option<String>,
}

async fn fetch_news_post(state: &AppState, post_id: i32) -> Result<BlogPost, ApiError> {
    let marker =
        sqlx::query_as::<_, NewsPost>("SELECT post_id FROM news_post WHERE post_id = $1")
            .bind(post_id)
            .fetch_optional(&state.db)
            .await?;
    if marker.is_none() {
        return Err(ApiError::NotFound("news_post post_id not found.".to_string()));
    }
    fetch_post(state, post_id).await
}

/// GET /api/v1/news-posts
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsListQuery>,
) -> Result<Response, ApiError> {
    let paging = Paging::clamp(query.page, query.per_page, DEFAULT_PER_PAGE);
    let options = ViewOptions {
        include_content: flag(query.include_content.as_deref(), true),
        include_analytics: flag(query.include_analytics.as_deref(), false),
        include_content_ref: false,
    };

    let posts = sqlx::query_as::<_, BlogPost>(
        r#"
        SELECT p.post_id, p.title, p.slug, p.blog_cat_id, p.author_id, p.image,
               p.content_mongo_id, p.created_at, p.updated_at
        FROM news_post n
        JOIN blog_post p ON p.post_id = n.post_id
        ORDER BY p.created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(paging.per_page)
    .bind(paging.offset())
    .fetch_all(&state.db)
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM news_post")
        .fetch_one(&state.db)
        .await?;

    let items = compose_posts(&state, &posts, options).await?;
    Ok(Json(Page::new(items, paging, total)).into_response())
}

/// POST /api/v1/news-posts - promote an existing post into the news feed.
pub async fn create_news(
    State(state): State<AppState>,
    Json(payload): Json<NewsPayload>,
) -> Result<Response, ApiError> {
    let post = sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_post WHERE post_id = $1"
    ))
    .bind(payload.post_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("BlogPost not found for given post_id.".to_string()))?;

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT post_id FROM news_post WHERE post_id = $1")
            .bind(payload.post_id)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "NewsPost already exists for this post_id.".to_string(),
        ));
    }

    sqlx::query("INSERT INTO news_post (post_id) VALUES ($1)")
        .bind(payload.post_id)
        .execute(&state.db)
        .await?;

    let view = compose_post(&state, &post, ViewOptions::list_defaults(), None).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// GET /api/v1/news-posts/{post_id}
pub async fn get_news(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Query(query): Query<NewsDetailQuery>,
) -> Result<Response, ApiError> {
    let post = fetch_news_post(&state, post_id).await?;
    let options = ViewOptions {
        include_content: flag(query.include_content.as_deref(), true),
        include_analytics: flag(query.include_analytics.as_deref(), false),
        include_content_ref: flag(query.include_content_ref.as_deref(), false),
    };
    let view = compose_post(&state, &post, options, None).await?;
    Ok(Json(view).into_response())
}

/// PUT/PATCH /api/v1/news-posts/{post_id}
///
/// The marker row has no mutable fields; both verbs validate the id and
/// echo the composed post, preserving the long-standing API surface.
pub async fn echo_news(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Response, ApiError> {
    let post = fetch_news_post(&state, post_id).await?;
    let view = compose_post(&state, &post, ViewOptions::list_defaults(), None).await?;
    Ok(Json(view).into_response())
}

/// DELETE /api/v1/news-posts/{post_id} - demote from the news feed; the base
/// post remains.
pub async fn delete_news(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Response, ApiError> {
    let result = sqlx::query("DELETE FROM news_post WHERE post_id = $1")
        .bind(post_id)
        .execute(&state.db)
        .await?;

    deleted_or_not_found(result.rows_affected(), "news_post post_id not found.")?;

    Ok(Json(json!({ "status": "deleted", "news_post_id": post_id })).into_response())
}
