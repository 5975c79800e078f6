//! API response envelope
//!
//! Every response, success or failure, has the shape
//! `{success, message, code, error?, data?}` where `code` repeats the HTTP
//! status and `error` is the machine-readable reason on failures.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::errors::messages::{self, Entity, Outcome};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    /// HTTP status code
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: status.as_u16(),
            error: None,
            data: Some(data),
        }
    }

    pub fn error(
        status: StatusCode,
        reason: &'static str,
        message: impl Into<String>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            message: message.into(),
            code: status.as_u16(),
            error: Some(reason),
            data: None,
        }
    }
}

/// Status plus envelope, as handlers return it
pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

/// Success envelope with the registry message for `(entity, outcome)`.
pub fn respond<T: Serialize>(entity: Entity, outcome: Outcome, data: T) -> Reply<T> {
    let status = outcome.http_status();
    (
        status,
        Json(ApiResponse::success(
            status,
            messages::success(entity, outcome),
            data,
        )),
    )
}

/// Success envelope without a `data` field.
pub fn respond_empty(entity: Entity, outcome: Outcome) -> Reply<()> {
    let status = outcome.http_status();
    (
        status,
        Json(ApiResponse {
            success: true,
            message: messages::success(entity, outcome).to_string(),
            code: status.as_u16(),
            error: None,
            data: None,
        }),
    )
}
