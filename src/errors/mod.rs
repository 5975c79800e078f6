//! Application error taxonomy.
//!
//! Services return [`AppError`]; the HTTP boundary renders it as the standard
//! envelope with only the user-facing message. The developer message and the
//! underlying detail go to the log.

pub mod db;
pub mod messages;

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::gateway::types::ApiResponse;

pub use db::{DbError, DbErrorKind};
pub use messages::{Entity, Outcome};

/// Error classes, each mapped to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ValidationFailed,
    PasswordMismatch,
    NotFound,
    Conflict,
    InUse,
    Unauthorized,
    Forbidden,
    Timeout,
    Unavailable,
    Internal,
}

impl ErrorKind {
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::ValidationFailed | Self::PasswordMismatch => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::InUse => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason carried in the `error` field of the envelope.
    pub fn name(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "ALREADY_EXISTS",
            Self::InUse => "IN_USE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Timeout => "TIMEOUT",
            Self::Unavailable => "SERVICE_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<DbErrorKind> for ErrorKind {
    fn from(kind: DbErrorKind) -> Self {
        match kind {
            DbErrorKind::NotFound => Self::NotFound,
            DbErrorKind::Conflict => Self::Conflict,
            DbErrorKind::BadRequest => Self::ValidationFailed,
            DbErrorKind::Forbidden => Self::Forbidden,
            DbErrorKind::Timeout => Self::Timeout,
            DbErrorKind::Connection => Self::Unavailable,
            DbErrorKind::Other => Self::Internal,
        }
    }
}

/// Typed service error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{entity}] {kind}: {dev_message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub entity: Entity,
    pub user_message: String,
    pub dev_message: String,
    /// Underlying cause, logged but never sent to clients
    pub detail: Option<String>,
}

impl AppError {
    /// Build an error with the registry messages for `(entity, kind)`.
    pub fn new(entity: Entity, kind: ErrorKind) -> Self {
        let msg = messages::error(entity, kind);
        Self {
            kind,
            entity,
            user_message: msg.user,
            dev_message: msg.dev,
            detail: None,
        }
    }

    pub fn validation(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(entity, ErrorKind::ValidationFailed).with_user_message(message)
    }

    pub fn internal(entity: Entity, detail: impl fmt::Display) -> Self {
        Self::new(entity, ErrorKind::Internal).with_detail(detail)
    }

    pub fn from_db(entity: Entity, err: DbError) -> Self {
        Self::new(entity, err.kind.into()).with_detail(err)
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = message.into();
        self
    }

    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.kind.http_status()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let detail = self.detail.as_deref().unwrap_or("-");
        if status.is_server_error() {
            tracing::error!(
                entity = %self.entity,
                kind = %self.kind,
                detail,
                "{}",
                self.dev_message
            );
        } else {
            tracing::debug!(
                entity = %self.entity,
                kind = %self.kind,
                detail,
                "{}",
                self.dev_message
            );
        }

        let body = ApiResponse::<()>::error(status, self.kind.name(), self.user_message);
        (status, Json(body)).into_response()
    }
}
