//! Per-post engagement counters and the pre-aggregated most-read reports.
//!
//! Detail reads never 404 on a missing counters row: when the post exists
//! the response is zero-filled, matching the composer's fallback rule.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::compose::{Page, Paging, DEFAULT_PER_PAGE, REPORT_PER_PAGE};
use crate::db::models::{BlogAnalytics, MostReadRow};
use crate::error::ApiError;
use crate::routes::deleted_or_not_found;
use crate::state::AppState;
use crate::validation::{AnalyticsPatch, AnalyticsPayload};

const ANALYTICS_COLUMNS: &str =
    "post_id, views, likes, comments, shares, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct AnalyticsListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub limit: Option<i64>,
}

async fn ensure_post_exists(state: &AppState, post_id: i32) -> Result<(), ApiError> {
    let exists: Option<(i32,)> = sqlx::query_as("SELECT post_id FROM blog_post WHERE post_id = $1")
        .bind(post_id)
        .fetch_optional(&state.db)
        .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("post_id not found.".to_string())),
    }
}

/// GET /api/v1/analytics
pub async fn list_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsListQuery>,
) -> Result<Response, ApiError> {
    let paging = Paging::clamp(query.page, query.per_page, DEFAULT_PER_PAGE);

    let items = sqlx::query_as::<_, BlogAnalytics>(&format!(
        r#"
        SELECT {ANALYTICS_COLUMNS} FROM blog_analytics
        ORDER BY updated_at DESC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(paging.per_page)
    .bind(paging.offset())
    .fetch_all(&state.db)
    .await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_analytics")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(Page::new(items, paging, total)).into_response())
}

/// POST /api/v1/analytics
pub async fn create_analytics(
    State(state): State<AppState>,
    Json(payload): Json<AnalyticsPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    ensure_post_exists(&state, payload.post_id).await?;

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT post_id FROM blog_analytics WHERE post_id = $1")
            .bind(payload.post_id)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "Analytics already exist for this post_id.".to_string(),
        ));
    }

    let row = sqlx::query_as::<_, BlogAnalytics>(&format!(
        r#"
        INSERT INTO blog_analytics (post_id, views, likes, comments, shares)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ANALYTICS_COLUMNS}
        "#
    ))
    .bind(payload.post_id)
    .bind(payload.views)
    .bind(payload.likes)
    .bind(payload.comments)
    .bind(payload.shares)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(row)).into_response())
}

/// GET /api/v1/analytics/{post_id} - zero-filled when no row exists.
pub async fn get_analytics(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Response, ApiError> {
    ensure_post_exists(&state, post_id).await?;
    let counters = crate::compose::analytics_for(&state.db, post_id).await?;
    Ok(Json(json!({ "post_id": post_id, "analytics": counters })).into_response())
}

/// PUT /api/v1/analytics/{post_id} - replace counters, creating the row if
/// absent.
pub async fn replace_analytics(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Json(mut payload): Json<AnalyticsPayload>,
) -> Result<Response, ApiError> {
    payload.post_id = post_id;
    payload.validate()?;
    ensure_post_exists(&state, post_id).await?;

    let row = sqlx::query_as::<_, BlogAnalytics>(&format!(
        r#"
        INSERT INTO blog_analytics (post_id, views, likes, comments, shares)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (post_id) DO UPDATE
        SET views = EXCLUDED.views, likes = EXCLUDED.likes,
            comments = EXCLUDED.comments, shares = EXCLUDED.shares,
            updated_at = now()
        RETURNING {ANALYTICS_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(payload.views)
    .bind(payload.likes)
    .bind(payload.comments)
    .bind(payload.shares)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row).into_response())
}

/// PATCH /api/v1/analytics/{post_id} - partial counter update against the
/// stored row (zero-filled when absent).
pub async fn update_analytics(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Json(patch): Json<AnalyticsPatch>,
) -> Result<Response, ApiError> {
    patch.validate()?;
    ensure_post_exists(&state, post_id).await?;

    let existing = crate::compose::analytics_for(&state.db, post_id).await?;

    let row = sqlx::query_as::<_, BlogAnalytics>(&format!(
        r#"
        INSERT INTO blog_analytics (post_id, views, likes, comments, shares)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (post_id) DO UPDATE
        SET views = EXCLUDED.views, likes = EXCLUDED.likes,
            comments = EXCLUDED.comments, shares = EXCLUDED.shares,
            updated_at = now()
        RETURNING {ANALYTICS_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(patch.views.unwrap_or(existing.views))
    .bind(patch.likes.unwrap_or(existing.likes))
    .bind(patch.comments.unwrap_or(existing.comments))
    .bind(patch.shares.unwrap_or(existing.shares))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row).into_response())
}

/// DELETE /api/v1/analytics/{post_id}
pub async fn delete_analytics(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Response, ApiError> {
    let result = sqlx::query("DELETE FROM blog_analytics WHERE post_id = $1")
        .bind(post_id)
        .execute(&state.db)
        .await?;

    deleted_or_not_found(result.rows_affected(), "Analytics not found for this post_id.")?;

    Ok(Json(json!({ "status": "deleted", "post_id": post_id })).into_response())
}

/// GET /api/v1/reports/most-read - read-only, sourced from the report view.
pub async fn most_read_posts(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(REPORT_PER_PAGE).clamp(1, 100);

    let items = sqlx::query_as::<_, MostReadRow>(
        r#"
        SELECT post_id, title, slug, blog_cat_id, author_id, image, created_at,
               views, likes, comments, shares
        FROM vw_most_read_posts
        ORDER BY views DESC, created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "items": items })).into_response())
}

/// GET /api/v1/reports/most-read-news - same report restricted to news
/// posts.
pub async fn most_read_news(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(REPORT_PER_PAGE).clamp(1, 100);

    let items = sqlx::query_as::<_, MostReadRow>(
        r#"
        SELECT post_id, title, slug, blog_cat_id, author_id, image, created_at,
               views, likes, comments, shares
        FROM vw_most_read_news
        ORDER BY views DESC, created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "items": items })).into_response())
}
