//! Blog post CRUD plus the cross-store content paths.
//!
//! Write ordering is fixed: on create the content document is written first
//! and the returned reference rides along on the row insert; on update the
//! FK pre-checks run first, then the content upsert, then the row update.
//! Post deletion cleans the content document up best-effort before removing
//! the row. None of this is transactional across the two stores.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::compose::{
    compose_post, compose_posts, Page, Paging, ViewOptions, DEFAULT_PER_PAGE,
    DEFAULT_RELATED_LIMIT,
};
use crate::db::models::BlogPost;
use crate::error::{unique_conflict, ApiError};
use crate::routes::{flag, like_pattern};
use crate::search::{self, SearchFields};
use crate::state::AppState;
use crate::validation::{PostPatch, PostPayload};

const CONFLICT_MSG: &str = "Title or slug already exists.";

pub(crate) const POST_COLUMNS: &str = "post_id, title, slug, blog_cat_id, author_id, image, \
     content_mongo_id, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub include_content: Option<String>,
    pub include_analytics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostDetailQuery {
    pub include_content: Option<String>,
    pub include_analytics: Option<String>,
    pub include_content_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NeighborQuery {
    pub limit: Option<i64>,
    pub include_content: Option<String>,
    pub include_analytics: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

pub(crate) async fn fetch_post(state: &AppState, post_id: i32) -> Result<BlogPost, ApiError> {
    sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_post WHERE post_id = $1"
    ))
    .bind(post_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("post_id not found.".to_string()))
}

/// FK pre-checks, run before any mutating call so a missing target surfaces
/// as a clean 404 instead of a constraint violation.
async fn ensure_category_exists(state: &AppState, blog_cat_id: i32) -> Result<(), ApiError> {
    let exists: Option<(i32,)> =
        sqlx::query_as("SELECT blog_cat_id FROM blog_category WHERE blog_cat_id = $1")
            .bind(blog_cat_id)
            .fetch_optional(&state.db)
            .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("blog_cat_id not found.".to_string())),
    }
}

async fn ensure_author_exists(state: &AppState, author_id: i32) -> Result<(), ApiError> {
    let exists: Option<(i32,)> =
        sqlx::query_as("SELECT my_user_id FROM my_user WHERE my_user_id = $1")
            .bind(author_id)
            .fetch_optional(&state.db)
            .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("author_id not found.".to_string())),
    }
}

/// Reference precedence on updates: an explicit `content_mongo_id` in the
/// payload is applied last and wins over the reference produced by a
/// content upsert, which wins over the stored one.
fn merged_content_ref(
    explicit: Option<String>,
    upserted: Option<String>,
    existing: Option<String>,
) -> Option<String> {
    explicit.or(upserted).or(existing)
}

fn list_options(query: &PostListQuery) -> ViewOptions {
    ViewOptions {
        include_content: flag(query.include_content.as_deref(), true),
        include_analytics: flag(query.include_analytics.as_deref(), false),
        include_content_ref: false,
    }
}

/// GET /api/v1/blog-posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Response, ApiError> {
    let paging = Paging::clamp(query.page, query.per_page, DEFAULT_PER_PAGE);
    let like = like_pattern(query.q.as_deref());
    let options = list_options(&query);

    let posts = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        SELECT {POST_COLUMNS} FROM blog_post
        WHERE ($1::text IS NULL OR title ILIKE $1 OR slug ILIKE $1)
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
        "SELECT COUNT(*) FROM blog_post
         WHERE ($1::text IS NULL OR title ILIKE $1 OR slug ILIKE $1)",
    )
    .bind(&like)
    .fetch_one(&state.db)
    .await?;

    let items = compose_posts(&state, &posts, options).await?;
    Ok(Json(Page::new(items, paging, total)).into_response())
}

/// POST /api/v1/blog-posts
pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<PostPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    ensure_category_exists(&state, payload.blog_cat_id).await?;
    ensure_author_exists(&state, payload.author_id).await?;

    // Content store first; its reference rides along on the row insert. If
    // the row insert then fails the document is orphaned (accepted gap).
    let mut content_ref = payload.content_mongo_id.clone();
    if let Some(content) = &payload.content {
        content_ref = Some(state.content.create(content).await?);
    }

    let post = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        INSERT INTO blog_post (title, slug, blog_cat_id, author_id, image, content_mongo_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(&payload.title)
    .bind(&payload.slug)
    .bind(payload.blog_cat_id)
    .bind(payload.author_id)
    .bind(&payload.image)
    .bind(&content_ref)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    let view = compose_post(
        &state,
        &post,
        ViewOptions::list_defaults(),
        payload.content.clone(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// GET /api/v1/blog-posts/{post_id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Query(query): Query<PostDetailQuery>,
) -> Result<Response, ApiError> {
    let post = fetch_post(&state, post_id).await?;
    let options = ViewOptions {
        include_content: flag(query.include_content.as_deref(), true),
        include_analytics: flag(query.include_analytics.as_deref(), false),
        include_content_ref: flag(query.include_content_ref.as_deref(), false),
    };
    let view = compose_post(&state, &post, options, None).await?;
    Ok(Json(view).into_response())
}

/// PUT /api/v1/blog-posts/{post_id} - full replace
pub async fn replace_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Json(payload): Json<PostPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;
    ensure_category_exists(&state, payload.blog_cat_id).await?;
    ensure_author_exists(&state, payload.author_id).await?;
    let existing = fetch_post(&state, post_id).await?;

    // Overwrite the existing document in place when it still resolves;
    // otherwise the reference silently moves to a fresh document.
    let mut upserted = None;
    if let Some(content) = &payload.content {
        let (new_ref, _was_created) = state
            .content
            .upsert(existing.content_mongo_id.as_deref(), content)
            .await?;
        upserted = Some(new_ref);
    }
    let content_ref = merged_content_ref(
        payload.content_mongo_id.clone(),
        upserted,
        existing.content_mongo_id.clone(),
    );

    let post = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        UPDATE blog_post
        SET title = $1, slug = $2, blog_cat_id = $3, author_id = $4,
            image = $5, content_mongo_id = $6, updated_at = now()
        WHERE post_id = $7
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(&payload.title)
    .bind(&payload.slug)
    .bind(payload.blog_cat_id)
    .bind(payload.author_id)
    .bind(&payload.image)
    .bind(&content_ref)
    .bind(post_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    let view = compose_post(
        &state,
        &post,
        ViewOptions::list_defaults(),
        payload.content.clone(),
    )
    .await?;
    Ok(Json(view).into_response())
}

/// PATCH /api/v1/blog-posts/{post_id} - partial update
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Json(patch): Json<PostPatch>,
) -> Result<Response, ApiError> {
    patch.validate()?;
    let existing = fetch_post(&state, post_id).await?;

    if let Some(blog_cat_id) = patch.blog_cat_id {
        ensure_category_exists(&state, blog_cat_id).await?;
    }
    if let Some(author_id) = patch.author_id {
        ensure_author_exists(&state, author_id).await?;
    }

    let mut upserted = None;
    if let Some(content) = &patch.content {
        let (new_ref, _was_created) = state
            .content
            .upsert(existing.content_mongo_id.as_deref(), content)
            .await?;
        upserted = Some(new_ref);
    }
    let content_ref = merged_content_ref(
        patch.content_mongo_id.clone(),
        upserted,
        existing.content_mongo_id.clone(),
    );

    let post = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        UPDATE blog_post
        SET title = $1, slug = $2, blog_cat_id = $3, author_id = $4,
            image = $5, content_mongo_id = $6, updated_at = now()
        WHERE post_id = $7
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(patch.title.as_ref().unwrap_or(&existing.title))
    .bind(patch.slug.as_ref().unwrap_or(&existing.slug))
    .bind(patch.blog_cat_id.unwrap_or(existing.blog_cat_id))
    .bind(patch.author_id.unwrap_or(existing.author_id))
    .bind(patch.image.as_ref().unwrap_or(&existing.image))
    .bind(&content_ref)
    .bind(post_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| unique_conflict(e, CONFLICT_MSG))?;

    let view = compose_post(
        &state,
        &post,
        ViewOptions::list_defaults(),
        patch.content.clone(),
    )
    .await?;
    Ok(Json(view).into_response())
}

/// DELETE /api/v1/blog-posts/{post_id}
///
/// The content document is removed best-effort first; a failed cleanup never
/// blocks the row delete.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Response, ApiError> {
    let post = fetch_post(&state, post_id).await?;

    state.content.cleanup(post.content_mongo_id.as_deref()).await;

    sqlx::query("DELETE FROM blog_post WHERE post_id = $1")
        .bind(post_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "status": "deleted", "post_id": post_id })).into_response())
}

/// GET /api/v1/blog-posts/{post_id}/related - newest posts sharing the
/// category, excluding the post itself.
pub async fn related_posts(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Query(query): Query<NeighborQuery>,
) -> Result<Response, ApiError> {
    let post = fetch_post(&state, post_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_RELATED_LIMIT).clamp(1, 50);
    let options = ViewOptions {
        include_content: flag(query.include_content.as_deref(), false),
        include_analytics: flag(query.include_analytics.as_deref(), false),
        include_content_ref: false,
    };

    let posts = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        SELECT {POST_COLUMNS} FROM blog_post
        WHERE blog_cat_id = $1 AND post_id <> $2
        ORDER BY created_at DESC
        LIMIT $3
        "#
    ))
    .bind(post.blog_cat_id)
    .bind(post_id)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    let items = compose_posts(&state, &posts, options).await?;
    Ok(Json(json!({ "items": items })).into_response())
}

/// GET /api/v1/blog-posts/{post_id}/read-next - newest posts excluding the
/// post itself, category-agnostic.
pub async fn read_next_posts(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    Query(query): Query<NeighborQuery>,
) -> Result<Response, ApiError> {
    fetch_post(&state, post_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_RELATED_LIMIT).clamp(1, 50);
    let options = ViewOptions {
        include_content: flag(query.include_content.as_deref(), false),
        include_analytics: flag(query.include_analytics.as_deref(), false),
        include_content_ref: false,
    };

    let posts = sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        SELECT {POST_COLUMNS} FROM blog_post
        WHERE post_id <> $1
        ORDER BY created_at DESC
        LIMIT $2
        "#
    ))
    .bind(post_id)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    let items = compose_posts(&state, &posts, options).await?;
    Ok(Json(json!({ "items": items })).into_response())
}

/// GET /api/v1/blog-posts/search - keyword-ranked post search.
///
/// Candidates come in newest-first so equal scores fall back to recency.
pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let q = query.q.unwrap_or_default();
    let limit = query.limit.unwrap_or(10).clamp(1, 50) as usize;

    #[derive(sqlx::FromRow)]
    struct Candidate {
        #[sqlx(flatten)]
        post: BlogPost,
        category_title: String,
    }

    let candidates = sqlx::query_as::<_, Candidate>(
        r#"
        SELECT p.post_id, p.title, p.slug, p.blog_cat_id, p.author_id, p.image,
               p.content_mongo_id, p.created_at, p.updated_at,
               c.title AS category_title
        FROM blog_post p
        JOIN blog_category c ON c.blog_cat_id = p.blog_cat_id
        ORDER BY p.created_at DESC
        LIMIT 500
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let ranked = search::rank(&q, candidates, |c| SearchFields {
        title: c.post.title.clone(),
        slug: c.post.slug.clone(),
        category: c.category_title.clone(),
    });

    let options = ViewOptions::default();
    let mut items = Vec::new();
    for candidate in ranked.into_iter().take(limit) {
        items.push(compose_post(&state, &candidate.post, options, None).await?);
    }

    Ok(Json(json!({ "items": items })).into_response())
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

    #[test]
    fn test_explicit_content_ref_wins_over_upsert() {
        let explicit = Some("explicit".to_string());
        let upserted = Some("fresh".to_string());
        let existing = Some("stored".to_string());

        assert_eq!(
            merged_content_ref(explicit.clone(), upserted.clone(), existing.clone()).as_deref(),
            Some("explicit")
        );
        assert_eq!(
            merged_content_ref(None, upserted, existing.clone()).as_deref(),
            Some("fresh")
        );
        assert_eq!(
            merged_content_ref(None, None, existing).as_deref(),
            Some("stored")
        );
        assert_eq!(merged_content_ref(None, None, None), None);
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_content_before_any_store_call() {
        let app = Router::new()
            .route("/blog-posts", post(create_post))
            .with_state(test_state());

        let req = Request::post("/blog-posts")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{
                    "title": "Beltline Update",
                    "slug": "Bad Slug",
                    "blog_cat_id": 1,
                    "author_id": 1,
                    "image": "beltline.jpg",
                    "content": ["not", "an", "object"]
                }"#,
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["error"].get("slug").is_some());
        assert!(value["error"].get("content").is_some());
    }
}
