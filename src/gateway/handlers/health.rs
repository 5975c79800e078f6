//! Health check handler

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use super::super::state::AppState;
use super::super::types::ApiResponse;
use crate::errors::ErrorKind;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check response data
#[derive(serde::Serialize)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: i64,
    pub version: &'static str,
}

/// Health check endpoint
///
/// Pings the database but does not expose why a ping failed.
///
/// - Healthy: 200 OK
/// - Unhealthy: 503 Service Unavailable
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let healthy = match state.db {
        Some(ref db) => match tokio::time::timeout(PING_TIMEOUT, db.health_check()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!("[HEALTH] PostgreSQL ping failed: {}", e);
                false
            }
            Err(_) => {
                tracing::error!("[HEALTH] PostgreSQL ping timed out");
                false
            }
        },
        None => {
            tracing::error!("[HEALTH] No database configured");
            false
        }
    };

    if healthy {
        let status = StatusCode::OK;
        (
            status,
            Json(ApiResponse::success(
                status,
                "ok",
                HealthResponse {
                    timestamp_ms: Utc::now().timestamp_millis(),
                    version: env!("BUILD_REV"),
                },
            )),
        )
    } else {
        let status = StatusCode::SERVICE_UNAVAILABLE;
        (
            status,
            Json(ApiResponse {
                success: false,
                message: "unavailable".to_string(),
                code: status.as_u16(),
                error: Some(ErrorKind::Unavailable.name()),
                data: None,
            }),
        )
    }
}
