//! Author (user) CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::compose::{Page, Paging, DEFAULT_PER_PAGE};
use crate::db::models::MyUser;
use crate::error::{unique_conflict, ApiError};
use crate::routes::{deleted_or_not_found, like_pattern};
use crate::state::AppState;
use crate::validation::{UserPatch, UserPayload};

const CONFLICT_MSG: &str = "Email already exists.";

const USER_COLUMNS: &str = "my_user_id, first_name, last_name, email, gender, dob, zip_code, \
     city_state, image, password_hash, is_active, is_admin, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

async fn fetch_user(state: &AppState, user_id: i32) -> Result<MyUser, ApiError> {
    sqlx::query_as::<_, MyUser>(&format!(
        "SELECT {USER_COLUMNS} FROM my_user WHERE my_user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("my_user_id not found.".to_string()))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Response, ApiError> {
    let paging = Paging::clamp(query.page, query.per_page, DEFAULT_PER_PAGE);
    let like = like_pattern(query.q.as_deref());

    let items = sqlx::query_as::<_, MyUser>(&format!(
        r#"
        SELECT {USER_COLUMNS} FROM my_user
        WHERE ($1::text IS NULL
               OR first_name ILIKE $1 OR last_name ILIKE $1
               OR email ILIKE $1 OR city_state ILIKE $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(&like)
    .bind(paging.per_page)
    .bind(paging.offset())
    .fetch_all(&state.db)
    .await?;

    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM my_user
        WHERE ($1::text IS NULL
               OR first_name ILIKE $1 OR last_name ILIKE $1
               OR email ILIKE $1 OR city_state ILIKE $1)
        "#,
    )
    .bind(&like)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Page::new(items, paging, total)).into_response())
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, MyUser>(&format!(
        r#"
        INSERT INTO my_user
            (first_name, last_name, email, gender, dob, zip_code, city_state,
             image, is_active, is_admin)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.gender)
    .bind(payload.dob)
    .bind(&payload.zip_code)
    .bind(&payload.city_state)
    .bind(&payload.image)
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.is_admin.unwrap_or(false))
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// GET /api/v1/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Response, ApiError> {
    let user = fetch_user(&state, user_id).await?;
    Ok(Json(user).into_response())
}

/// PUT /api/v1/users/{user_id} - full replace
pub async fn replace_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(payload): Json<UserPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    let existing = fetch_user(&state, user_id).await?;

    let user = sqlx::query_as::<_, MyUser>(&format!(
        r#"
        UPDATE my_user
        SET first_name = $1, last_name = $2, email = $3, gender = $4, dob = $5,
            zip_code = $6, city_state = $7, image = $8, is_active = $9,
            is_admin = $10, updated_at = now()
        WHERE my_user_id = $11
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.gender)
    .bind(payload.dob)
    .bind(&payload.zip_code)
    .bind(&payload.city_state)
    .bind(&payload.image)
    .bind(payload.is_active.unwrap_or(existing.is_active))
    .bind(payload.is_admin.unwrap_or(existing.is_admin))
    .bind(user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    Ok(Json(user).into_response())
}

/// PATCH /api/v1/users/{user_id} - partial update
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(patch): Json<UserPatch>,
) -> Result<Response, ApiError> {
    patch.validate()?;
    let existing = fetch_user(&state, user_id).await?;

    let user = sqlx::query_as::<_, MyUser>(&format!(
        r#"
        UPDATE my_user
        SET first_name = $1, last_name = $2, email = $3, gender = $4, dob = $5,
            zip_code = $6, city_state = $7, image = $8, is_active = $9,
            is_admin = $10, updated_at = now()
        WHERE my_user_id = $11
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(patch.first_name.unwrap_or(existing.first_name))
    .bind(patch.last_name.unwrap_or(existing.last_name))
    .bind(patch.email.unwrap_or(existing.email))
    .bind(patch.gender.unwrap_or(existing.gender))
    .bind(patch.dob.unwrap_or(existing.dob))
    .bind(patch.zip_code.unwrap_or(existing.zip_code))
    // Absent keeps the stored value; an explicit null clears it.
    .bind(patch.city_state.unwrap_or(existing.city_state))
    .bind(patch.image.unwrap_or(existing.image))
    .bind(patch.is_active.unwrap_or(existing.is_active))
    .bind(patch.is_admin.unwrap_or(existing.is_admin))
    .bind(user_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    Ok(Json(user).into_response())
}

/// DELETE /api/v1/users/{user_id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Response, ApiError> {
    let result = sqlx::query("DELETE FROM my_user WHERE my_user_id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    deleted_or_not_found(result.rows_affected(), "my_user_id not found.")?;

    Ok(Json(json!({ "status": "deleted", "my_user_id": user_id })).into_response())
}
