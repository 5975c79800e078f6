//! Request extractors that reject with the standard envelope.

use axum::{
    Json,
    body::Body,
    extract::{FromRequest, FromRequestParts, Path},
    http::{Request, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::response::ApiResponse;
use crate::errors::ErrorKind;

/// Rejection for [`JsonBody`] and [`IdPath`]: 400 `VALIDATION_FAILED`.
#[derive(Debug)]
pub struct RequestRejection {
    pub message: String,
}

impl IntoResponse for RequestRejection {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = ApiResponse::<()>::error(status, ErrorKind::ValidationFailed.name(), self.message);
        (status, Json(body)).into_response()
    }
}

/// JSON body extractor. Shape validation is left to the services.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RequestRejection;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| RequestRejection {
                message: format!("Invalid request body: {}", e.body_text()),
            })?;
        Ok(JsonBody(value))
    }
}

/// `{id}` path segment parsed as a UUID.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = RequestRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| RequestRejection {
                message: e.body_text(),
            })?;
        Uuid::parse_str(&raw)
            .map(IdPath)
            .map_err(|_| RequestRejection {
                message: format!("Invalid id: {}", raw),
            })
    }
}
