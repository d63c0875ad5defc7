//! Health endpoints - liveness plus per-store probes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::state::AppState;

lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Pin the uptime baseline; called once from `run()`.
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    fn healthy(elapsed: std::time::Duration) -> Self {
        Self {
            status: "healthy".to_string(),
            response_time_ms: Some(elapsed.as_millis() as u64),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            response_time_ms: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: ServiceCheck,
    pub content_store: ServiceCheck,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn database_check(state: &AppState) -> ServiceCheck {
    match crate::db::health_check(&state.db).await {
        Ok(elapsed) => ServiceCheck::healthy(elapsed),
        Err(e) => ServiceCheck::unhealthy(e.to_string()),
    }
}

/// The content store being unconfigured is reported, not treated as a
/// failure; the API runs content-less in that state.
async fn content_check(state: &AppState) -> ServiceCheck {
    if !state.content.is_configured() {
        return ServiceCheck {
            status: "unconfigured".to_string(),
            response_time_ms: None,
            error: None,
        };
    }
    let start = Instant::now();
    match state.content.ping().await {
        Ok(()) => ServiceCheck::healthy(start.elapsed()),
        Err(e) => ServiceCheck::unhealthy(e.to_string()),
    }
}

/// GET /health
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/database
pub async fn health_database(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(database_check(&state).await))
}

/// GET /health/content
pub async fn health_content(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(content_check(&state).await))
}

/// GET /health/detailed
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let response = DetailedHealthResponse {
        // Overall "ok" as long as the process answers; store states are in
        // the individual checks.
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime_secs: SERVER_START.elapsed().as_secs(),
        checks: HealthChecks {
            database: database_check(&state).await,
            content_store: content_check(&state).await,
        },
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - ready only when the relational store answers; the
/// content store is optional by design.
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let database = database_check(&state).await;
    let is_ready = database.status == "healthy";

    let response = ReadyResponse {
        status: if is_ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime_secs: SERVER_START.elapsed().as_secs(),
        reason: (!is_ready).then(|| "Database is not healthy".to_string()),
    };
    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/health", get(health_ping))
            .route("/health/content", get(health_content))
            .route("/health/database", get(health_database))
            .with_state(test_state())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        init_start_time();
        let (status, body) = get_json::<SimpleHealthResponse>(test_router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_content_healthy_with_memory_store() {
        let (status, body) = get_json::<ServiceCheck>(test_router(), "/health/content").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn test_health_database_unhealthy_without_server() {
        let (status, body) = get_json::<ServiceCheck>(test_router(), "/health/database").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "unhealthy");
    }
}
