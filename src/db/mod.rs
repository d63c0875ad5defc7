pub mod models;

use sqlx::{postgres::PgPoolOptions, PgPool};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/localnews".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            acquire_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

/// Build the connection pool. The pool is handed to `AppState` by the
/// caller; nothing stores it globally.
pub async fn init_pool(config: Option<DbConfig>) -> Result<PgPool, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<std::time::Duration, sqlx::Error> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(start.elapsed())
}

/// Create the steady-state schema and report views. Idempotent; runs at
/// startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_category (
            blog_cat_id SERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL UNIQUE,
            slug VARCHAR(255) NOT NULL UNIQUE,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS my_user (
            my_user_id SERIAL PRIMARY KEY,
            first_name VARCHAR(255) NOT NULL,
            last_name VARCHAR(255) NOT NULL,
            email VARCHAR(300) NOT NULL UNIQUE,
            gender VARCHAR(20) NOT NULL,
            dob DATE NOT NULL,
            zip_code VARCHAR(10) NOT NULL,
            city_state VARCHAR(300),
            image VARCHAR(300) NOT NULL,
            password_hash TEXT,
            is_active BOOLEAN NOT NULL DEFAULT true,
            is_admin BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_post (
            post_id SERIAL PRIMARY KEY,
            title VARCHAR(255) NOT NULL UNIQUE,
            slug VARCHAR(255) NOT NULL UNIQUE,
            blog_cat_id INTEGER NOT NULL REFERENCES blog_category(blog_cat_id),
            author_id INTEGER NOT NULL REFERENCES my_user(my_user_id),
            image VARCHAR(300) NOT NULL,
            content_mongo_id VARCHAR(255),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_blog_post_created_at
            ON blog_post(created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_blog_post_blog_cat_id
            ON blog_post(blog_cat_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS news_post (
            post_id INTEGER PRIMARY KEY
                REFERENCES blog_post(post_id) ON DELETE CASCADE
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS news_main (
            news_main_id SERIAL PRIMARY KEY,
            post_id INTEGER NOT NULL
                REFERENCES news_post(post_id) ON DELETE CASCADE,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT news_main_window CHECK (end_date > start_date)
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_news_main_dates
            ON news_main(start_date DESC, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_analytics (
            post_id INTEGER PRIMARY KEY
                REFERENCES blog_post(post_id) ON DELETE CASCADE,
            views BIGINT NOT NULL DEFAULT 0 CHECK (views >= 0),
            likes BIGINT NOT NULL DEFAULT 0 CHECK (likes >= 0),
            comments BIGINT NOT NULL DEFAULT 0 CHECK (comments >= 0),
            shares BIGINT NOT NULL DEFAULT 0 CHECK (shares >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Pre-aggregated report views backing the read-only most-read endpoints.
    sqlx::query(
        r#"
        CREATE OR REPLACE VIEW vw_most_read_posts AS
        SELECT p.post_id, p.title, p.slug, p.blog_cat_id, p.author_id,
               p.image, p.created_at,
               COALESCE(a.views, 0) AS views,
               COALESCE(a.likes, 0) AS likes,
               COALESCE(a.comments, 0) AS comments,
               COALESCE(a.shares, 0) AS shares
        FROM blog_post p
        LEFT JOIN blog_analytics a ON a.post_id = p.post_id
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE OR REPLACE VIEW vw_most_read_news AS
        SELECT p.post_id, p.title, p.slug, p.blog_cat_id, p.author_id,
               p.image, p.created_at,
               COALESCE(a.views, 0) AS views,
               COALESCE(a.likes, 0) AS likes,
               COALESCE(a.comments, 0) AS comments,
               COALESCE(a.shares, 0) AS shares
        FROM news_post n
        JOIN blog_post p ON p.post_id = n.post_id
        LEFT JOIN blog_analytics a ON a.post_id = p.post_id
    "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(config.max_connections >= 1);
        assert!(config.acquire_timeout_secs >= 1);
        assert!(config.idle_timeout_secs >= 1);
        assert!(!config.url.is_empty());
    }
}
