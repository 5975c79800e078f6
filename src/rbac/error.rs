//! Authorization failure codes.
//!
//! Rendered by the bearer middleware and the permission gate using the
//! standard response envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::token::TokenError;
use crate::gateway::types::ApiResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// No Authorization header, or an empty one
    NoTokenProvided,
    /// Header not of the form `Bearer <token>`, or token failed verification
    InvalidToken,
    /// Token verified but its expiry has passed
    ExpiredToken,
    /// Token valid, required permission not granted
    PermissionDenied,
}

impl AuthErrorCode {
    pub fn name(self) -> &'static str {
        match self {
            Self::NoTokenProvided => "NO_TOKEN_PROVIDED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::PermissionDenied => "PERMISSION_DENIED",
        }
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {message}", .code.name())]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_code(code: AuthErrorCode) -> Self {
        let message = match code {
            AuthErrorCode::NoTokenProvided => "Authorization token is required.",
            AuthErrorCode::InvalidToken => "Invalid or malformed token.",
            AuthErrorCode::ExpiredToken => "Session expired. Please sign in again.",
            AuthErrorCode::PermissionDenied => {
                "You do not have permission to perform this action."
            }
        };
        Self::new(code, message)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NoToken => Self::from_code(AuthErrorCode::NoTokenProvided),
            TokenError::Expired => Self::from_code(AuthErrorCode::ExpiredToken),
            TokenError::Malformed(_) => Self::from_code(AuthErrorCode::InvalidToken),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.code.http_status();
        let body = ApiResponse::<()>::error(status, self.code.name(), self.message);
        (status, Json(body)).into_response()
    }
}
