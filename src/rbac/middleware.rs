use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use super::error::{AuthError, AuthErrorCode};
use super::permission::{AuthContext, Permission};
use super::token::TokenService;

/// Pull the token out of an `Authorization` header value.
///
/// The value must split on single spaces into exactly two parts, the first
/// being literally `Bearer`. An empty second part is passed through and
/// rejected by verification as a missing token.
pub fn bearer_token(value: &str) -> Result<&str, AuthError> {
    if value.is_empty() {
        return Err(AuthError::from_code(AuthErrorCode::NoTokenProvided));
    }
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(token),
        _ => Err(AuthError::from_code(AuthErrorCode::InvalidToken)),
    }
}

/// Verifies the bearer token and attaches an [`AuthContext`] to the request.
pub async fn jwt_auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = match request.headers().get(header::AUTHORIZATION) {
        None => return Err(AuthError::from_code(AuthErrorCode::NoTokenProvided)),
        Some(v) => v
            .to_str()
            .map_err(|_| AuthError::from_code(AuthErrorCode::InvalidToken))?,
    };

    let token = bearer_token(header_value)?;
    let ctx = tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        AuthError::from(e)
    })?;

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Permission gate. Layer it on a route with
/// `from_fn_with_state(Permission::X, require_permission)`, inside
/// [`jwt_auth_middleware`].
pub async fn require_permission(
    State(required): State<Permission>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(ctx) = request.extensions().get::<AuthContext>() else {
        return Err(AuthError::from_code(AuthErrorCode::NoTokenProvided));
    };

    if !ctx.allows(required) {
        tracing::warn!(
            account_id = %ctx.account_id,
            required = %required,
            "permission denied"
        );
        return Err(AuthError::from_code(AuthErrorCode::PermissionDenied));
    }

    Ok(next.run(request).await)
}
