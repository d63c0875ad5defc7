//! Shared application state, injected into every handler.
//!
//! Both stores are process-wide resources with an explicit init lifecycle:
//! built once at startup, health-checked, then handed to the router. Tests
//! substitute the in-memory content store through the same seam.

use std::sync::Arc;

use sqlx::PgPool;

use crate::content::ContentCoordinator;

pub const DEFAULT_MEDIA_BASE_URL: &str = "/static/uploads";

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub content: ContentCoordinator,
    /// Base joined onto relative `image` references to produce `media_url`.
    pub media_base_url: Arc<str>,
}

impl AppState {
    pub fn new(db: PgPool, content: ContentCoordinator, media_base_url: &str) -> Self {
        Self {
            db,
            content,
            media_base_url: Arc::from(media_base_url),
        }
    }
}

#[cfg(test)]
pub fn test_state() -> AppState {
    use crate::content::MemoryContentStore;

    // Lazy pool pointed nowhere; tests that exercise SQL paths are expected
    // to fail fast rather than hang.
    let db = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(250))
        .connect_lazy("postgresql://127.0.0.1:1/unreachable")
        .expect("lazy test pool");

    AppState::new(
        db,
        ContentCoordinator::new(Arc::new(MemoryContentStore::new())),
        DEFAULT_MEDIA_BASE_URL,
    )
}
