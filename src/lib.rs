//! Local news backend - dual-store content API over Postgres and Mongo.

pub mod compose;
pub mod content;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod search;
pub mod state;
pub mod validation;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::content::coordinator::ContentCoordinator;
use crate::content::{ContentStoreConfig, MongoContentStore};
use crate::state::{AppState, DEFAULT_MEDIA_BASE_URL};

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, with a
/// localhost fallback for development.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    let api = Router::new()
        .route(
            "/blog-categories",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/blog-categories/{id}",
            get(routes::categories::get_category)
                .put(routes::categories::replace_category)
                .patch(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/users/{id}",
            get(routes::users::get_user)
                .put(routes::users::replace_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/blog-posts",
            get(routes::posts::list_posts).post(routes::posts::create_post),
        )
        .route("/blog-posts/search", get(routes::posts::search_posts))
        .route(
            "/blog-posts/{id}",
            get(routes::posts::get_post)
                .put(routes::posts::replace_post)
                .patch(routes::posts::update_post)
                .delete(routes::posts::delete_post),
        )
        .route("/blog-posts/{id}/related", get(routes::posts::related_posts))
        .route(
            "/blog-posts/{id}/read-next",
            get(routes::posts::read_next_posts),
        )
        .route(
            "/news-posts",
            get(routes::news::list_news).post(routes::news::create_news),
        )
        .route(
            "/news-posts/{post_id}",
            get(routes::news::get_news)
                .put(routes::news::echo_news)
                .patch(routes::news::echo_news)
                .delete(routes::news::delete_news),
        )
        .route(
            "/news-main",
            get(routes::news_main::list_windows).post(routes::news_main::create_window),
        )
        .route(
            "/news-main/{id}",
            get(routes::news_main::get_window)
                .put(routes::news_main::replace_window)
                .patch(routes::news_main::update_window)
                .delete(routes::news_main::delete_window),
        )
        .route(
            "/analytics",
            get(routes::analytics::list_analytics).post(routes::analytics::create_analytics),
        )
        .route(
            "/analytics/{post_id}",
            get(routes::analytics::get_analytics)
                .put(routes::analytics::replace_analytics)
                .patch(routes::analytics::update_analytics)
                .delete(routes::analytics::delete_analytics),
        )
        .route("/reports/most-read", get(routes::analytics::most_read_posts))
        .route(
            "/reports/most-read-news",
            get(routes::analytics::most_read_news),
        );

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/content", get(routes::health::health_content))
        .route("/health/ready", get(routes::health::health_ready))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

/// Connect the document store if configured. A missing or unreachable
/// store is not fatal; the API keeps serving rows without content.
async fn connect_content_store() -> ContentCoordinator {
    let Some(config) = ContentStoreConfig::from_env() else {
        tracing::info!("CONTENT_DB_URI not set. Running without the content store.");
        return ContentCoordinator::unconfigured();
    };

    match MongoContentStore::connect(&config).await {
        Ok(store) => {
            tracing::info!("Content store connected");
            ContentCoordinator::new(Arc::new(store))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to connect content store: {}. Continuing without it.",
                e
            );
            ContentCoordinator::unconfigured()
        }
    }
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the process lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    // The relational store is the system of record; refuse to start
    // without it.
    let pool = match db::init_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to initialize database pool: {}", e);
            panic!("FATAL: database connection is required. Set DATABASE_URL.");
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        tracing::error!("Failed to run database migrations: {}", e);
        panic!("FATAL: database migrations failed.");
    }

    let content = connect_content_store().await;

    let media_base_url =
        std::env::var("MEDIA_BASE_URL").unwrap_or_else(|_| DEFAULT_MEDIA_BASE_URL.to_string());

    let app = create_app(AppState::new(pool, content, &media_base_url));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_create_app_routes_health() {
        let app = create_app(state::test_state());
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_app(state::test_state());
        let res = app
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
