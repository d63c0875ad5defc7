//! Main-story windows - dated ranges during which a news post is the
//! featured lead story.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::compose::{compose_post, Page, Paging, PostView, ViewOptions, DEFAULT_PER_PAGE};
use crate::db::models::{BlogPost, NewsMain};
use crate::error::ApiError;
use crate::routes::posts::POST_COLUMNS;
use crate::routes::{deleted_or_not_found, flag};
use crate::state::AppState;
use crate::validation::{validate_date_range, NewsMainPatch, NewsMainPayload};

const OVERLAP_MSG: &str = "An overlapping main-story window already exists.";

const WINDOW_COLUMNS: &str =
    "news_main_id, post_id, start_date, end_date, notes, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct WindowListQuery {
    pub active: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub include_post: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowDetailQuery {
    pub include_post: Option<String>,
}

/// Window plus its optionally-resolved featured post.
#[derive(Debug, Serialize)]
pub struct WindowView {
    pub news_main_id: i32,
    pub post_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<PostView>,
}

async fn fetch_window(state: &AppState, news_main_id: i32) -> Result<NewsMain, ApiError> {
    sqlx::query_as::<_, NewsMain>(&format!(
        "SELECT {WINDOW_COLUMNS} FROM news_main WHERE news_main_id = $1"
    ))
    .bind(news_main_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("news_main_id not found.".to_string()))
}

async fn ensure_news_post_exists(state: &AppState, post_id: i32) -> Result<(), ApiError> {
    let exists: Option<(i32,)> = sqlx::query_as("SELECT post_id FROM news_post WHERE post_id = $1")
        .bind(post_id)
        .fetch_optional(&state.db)
        .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("news_post post_id not found.".to_string())),
    }
}

/// Reject windows that intersect an existing one. `exclude` skips the row
/// being updated.
async fn ensure_no_overlap(
    state: &AppState,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude: Option<i32>,
) -> Result<(), ApiError> {
    let (overlaps,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM news_main
            WHERE start_date <= $2 AND end_date >= $1
              AND ($3::int IS NULL OR news_main_id <> $3)
        )
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(exclude)
    .fetch_one(&state.db)
    .await?;

    if overlaps {
        return Err(ApiError::Conflict(OVERLAP_MSG.to_string()));
    }
    Ok(())
}

/// Resolve the window's featured post directly by id. A window whose post
/// row has vanished composes without a `post` key rather than erroring.
async fn resolve_window_post(
    state: &AppState,
    post_id: i32,
    options: ViewOptions,
) -> Result<Option<PostView>, ApiError> {
    let post = sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_post WHERE post_id = $1"
    ))
    .bind(post_id)
    .fetch_optional(&state.db)
    .await?;

    match post {
        Some(post) => Ok(Some(compose_post(state, &post, options, None).await?)),
        None => {
            tracing::warn!(post_id, "main-story window references a missing post");
            Ok(None)
        }
    }
}

async fn compose_window(
    state: &AppState,
    window: NewsMain,
    include_post: bool,
) -> Result<WindowView, ApiError> {
    let post = if include_post {
        resolve_window_post(state, window.post_id, ViewOptions::default()).await?
    } else {
        None
    };

    Ok(WindowView {
        news_main_id: window.news_main_id,
        post_id: window.post_id,
        start_date: window.start_date,
        end_date: window.end_date,
        notes: window.notes,
        created_at: window.created_at,
        updated_at: window.updated_at,
        post,
    })
}

/// GET /api/v1/news-main
///
/// `active=true` keeps only windows covering today; otherwise all windows,
/// newest start date first.
pub async fn list_windows(
    State(state): State<AppState>,
    Query(query): Query<WindowListQuery>,
) -> Result<Response, ApiError> {
    let paging = Paging::clamp(query.page, query.per_page, DEFAULT_PER_PAGE);
    let active_only = flag(query.active.as_deref(), false);
    let include_post = flag(query.include_post.as_deref(), true);

    let windows = sqlx::query_as::<_, NewsMain>(&format!(
        r#"
        SELECT {WINDOW_COLUMNS} FROM news_main
        WHERE ($1 = false OR (start_date <= CURRENT_DATE AND end_date >= CURRENT_DATE))
        ORDER BY start_date DESC, created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(active_only)
    .bind(paging.per_page)
    .bind(paging.offset())
    .fetch_all(&state.db)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM news_main
        WHERE ($1 = false OR (start_date <= CURRENT_DATE AND end_date >= CURRENT_DATE))
        "#,
    )
    .bind(active_only)
    .fetch_one(&state.db)
    .await?;

    let mut items = Vec::with_capacity(windows.len());
    for window in windows {
        items.push(compose_window(&state, window, include_post).await?);
    }

    Ok(Json(Page::new(items, paging, total)).into_response())
}

/// POST /api/v1/news-main
pub async fn create_window(
    State(state): State<AppState>,
    Json(payload): Json<NewsMainPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    ensure_news_post_exists(&state, payload.post_id).await?;
    ensure_no_overlap(&state, payload.start_date, payload.end_date, None).await?;

    let window = sqlx::query_as::<_, NewsMain>(&format!(
        r#"
        INSERT INTO news_main (post_id, start_date, end_date, notes)
        VALUES ($1, $2, $3, $4)
        RETURNING {WINDOW_COLUMNS}
        "#
    ))
    .bind(payload.post_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.notes)
    .fetch_one(&state.db)
    .await?;

    let view = compose_window(&state, window, true).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// GET /api/v1/news-main/{news_main_id}
pub async fn get_window(
    State(state): State<AppState>,
    Path(news_main_id): Path<i32>,
    Query(query): Query<WindowDetailQuery>,
) -> Result<Response, ApiError> {
    let window = fetch_window(&state, news_main_id).await?;
    let include_post = flag(query.include_post.as_deref(), true);
    let view = compose_window(&state, window, include_post).await?;
    Ok(Json(view).into_response())
}

/// PUT /api/v1/news-main/{news_main_id} - full replace
pub async fn replace_window(
    State(state): State<AppState>,
    Path(news_main_id): Path<i32>,
    Json(payload): Json<NewsMainPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    fetch_window(&state, news_main_id).await?;
    ensure_news_post_exists(&state, payload.post_id).await?;
    ensure_no_overlap(
        &state,
        payload.start_date,
        payload.end_date,
        Some(news_main_id),
    )
    .await?;

    let window = sqlx::query_as::<_, NewsMain>(&format!(
        r#"
        UPDATE news_main
        SET post_id = $1, start_date = $2, end_date = $3, notes = $4, updated_at = now()
        WHERE news_main_id = $5
        RETURNING {WINDOW_COLUMNS}
        "#
    ))
    .bind(payload.post_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.notes)
    .bind(news_main_id)
    .fetch_one(&state.db)
    .await?;

    let view = compose_window(&state, window, true).await?;
    Ok(Json(view).into_response())
}

/// PATCH /api/v1/news-main/{news_main_id} - partial update; merged dates are
/// re-checked so a patch cannot invert or overlap the window.
pub async fn update_window(
    State(state): State<AppState>,
    Path(news_main_id): Path<i32>,
    Json(patch): Json<NewsMainPatch>,
) -> Result<Response, ApiError> {
    let existing = fetch_window(&state, news_main_id).await?;

    let post_id = patch.post_id.unwrap_or(existing.post_id);
    let start_date = patch.start_date.unwrap_or(existing.start_date);
    let end_date = patch.end_date.unwrap_or(existing.end_date);
    // Absent keeps the stored value; an explicit null clears it.
    let notes = patch.notes.unwrap_or(existing.notes);

    validate_date_range(start_date, end_date)?;
    if patch.post_id.is_some() {
        ensure_news_post_exists(&state, post_id).await?;
    }
    ensure_no_overlap(&state, start_date, end_date, Some(news_main_id)).await?;

    let window = sqlx::query_as::<_, NewsMain>(&format!(
        r#"
        UPDATE news_main
        SET post_id = $1, start_date = $2, end_date = $3, notes = $4, updated_at = now()
        WHERE news_main_id = $5
        RETURNING {WINDOW_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(start_date)
    .bind(end_date)
    .bind(&notes)
    .bind(news_main_id)
    .fetch_one(&state.db)
    .await?;

    let view = compose_window(&state, window, true).await?;
    Ok(Json(view).into_response())
}

/// DELETE /api/v1/news-main/{news_main_id}
pub async fn delete_window(
    State(state): State<AppState>,
    Path(news_main_id): Path<i32>,
) -> Result<Response, ApiError> {
    let result = sqlx::query("DELETE FROM news_main WHERE news_main_id = $1")
        .bind(news_main_id)
        .execute(&state.db)
        .await?;

    deleted_or_not_found(result.rows_affected(), "news_main_id not found.")?;

    Ok(Json(json!({ "status": "deleted", "news_main_id": news_main_id })).into_response())
}
