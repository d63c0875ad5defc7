//! Blog category CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::compose::{Page, Paging, DEFAULT_PER_PAGE};
use crate::db::models::BlogCategory;
use crate::error::{unique_conflict, ApiError};
use crate::routes::{deleted_or_not_found, like_pattern};
use crate::state::AppState;
use crate::validation::{CategoryPatch, CategoryPayload};

const CONFLICT_MSG: &str = "Title or slug already exists.";

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

async fn fetch_category(state: &AppState, cat_id: i32) -> Result<BlogCategory, ApiError> {
    sqlx::query_as::<_, BlogCategory>(
        "SELECT blog_cat_id, title, slug, description, created_at, updated_at
         FROM blog_category WHERE blog_cat_id = $1",
    )
    .bind(cat_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("blog_cat_id not found.".to_string()))
}

/// GET /api/v1/blog-categories
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Response, ApiError> {
    let paging = Paging::clamp(query.page, query.per_page, DEFAULT_PER_PAGE);
    let like = like_pattern(query.q.as_deref());

    let items = sqlx::query_as::<_, BlogCategory>(
        r#"
        SELECT blog_cat_id, title, slug, description, created_at, updated_at
        FROM blog_category
        WHERE ($1::text IS NULL OR title ILIKE $1 OR slug ILIKE $1 OR description ILIKE $1)
        ORDER BY title ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&like)
    .bind(paging.per_page)
    .bind(paging.offset())
    .fetch_all(&state.db)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM blog_category
        WHERE ($1::text IS NULL OR title ILIKE $1 OR slug ILIKE $1 OR description ILIKE $1)
        "#,
    )
    .bind(&like)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Page::new(items, paging, total)).into_response())
}

/// POST /api/v1/blog-categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let category = sqlx::query_as::<_, BlogCategory>(
        r#"
        INSERT INTO blog_category (title, slug, description)
        VALUES ($1, $2, $3)
        RETURNING blog_cat_id, title, slug, description, created_at, updated_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.slug)
    .bind(&payload.description)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    Ok((StatusCode::CREATED, Json(category)).into_response())
}

/// GET /api/v1/blog-categories/{cat_id}
pub async fn get_category(
    State(state): State<AppState>,
    Path(cat_id): Path<i32>,
) -> Result<Response, ApiError> {
    let category = fetch_category(&state, cat_id).await?;
    Ok(Json(category).into_response())
}

/// PUT /api/v1/blog-categories/{cat_id} - full replace
pub async fn replace_category(
    State(state): State<AppState>,
    Path(cat_id): Path<i32>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    fetch_category(&state, cat_id).await?;

    let category = sqlx::query_as::<_, BlogCategory>(
        r#"
        UPDATE blog_category
        SET title = $1, slug = $2, description = $3, updated_at = now()
        WHERE blog_cat_id = $4
        RETURNING blog_cat_id, title, slug, description, created_at, updated_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.slug)
    .bind(&payload.description)
    .bind(cat_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    Ok(Json(category).into_response())
}

/// PATCH /api/v1/blog-categories/{cat_id} - partial update
pub async fn update_category(
    State(state): State<AppState>,
    Path(cat_id): Path<i32>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Response, ApiError> {
    patch.validate()?;
    let existing = fetch_category(&state, cat_id).await?;

    let title = patch.title.unwrap_or(existing.title);
    let slug = patch.slug.unwrap_or(existing.slug);
    // Absent keeps the stored value; an explicit null clears it.
    let description = patch.description.unwrap_or(existing.description);

    let category = sqlx::query_as::<_, BlogCategory>(
        r#"
        UPDATE blog_category
        SET title = $1, slug = $2, description = $3, updated_at = now()
        WHERE blog_cat_id = $4
        RETURNING blog_cat_id, title, slug, description, created_at, updated_at
        "#,
    )
    .bind(&title)
    .bind(&slug)
    .bind(&description)
    .bind(cat_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    Ok(Json(category).into_response())
}

/// DELETE /api/v1/blog-categories/{cat_id}
pub async fn delete_category(
    State(state): State<AppState>,
    Path(cat_id): Path<i32>,
) -> Result<Response, ApiError> {
    let result = sqlx::query("DELETE FROM blog_category WHERE blog_cat_id = $1")
        .bind(cat_id)
        .execute(&state.db)
        .await?;

    deleted_or_not_found(result.rows_affected(), "blog_cat_id not found.")?;

    Ok(Json(json!({ "status": "deleted", "blog_cat_id": cat_id })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/blog-categories", post(create_category))
            .with_state(test_state())
    }

    #[tokio::test]
    async fn test_create_rejects_non_canonical_slug_before_any_store_call() {
        let req = Request::post("/blog-categories")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"title": "Local News", "slug": "Local News"}"#,
            ))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"]["slug"].as_str().unwrap().contains("URL-safe"));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields() {
        let req = Request::post("/blog-categories")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title": "Local News"}"#))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        // Missing required field fails body deserialization.
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
