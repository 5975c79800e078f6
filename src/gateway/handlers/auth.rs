use std::sync::Arc;

use axum::extract::State;

use crate::account::{AuthSession, LoginRequest, RegisterRequest};
use crate::errors::{AppError, Entity, Outcome};
use crate::gateway::state::AppState;
use crate::gateway::types::{JsonBody, Reply, respond};

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Reply<AuthSession>, AppError> {
    let session = state.accounts.register(req).await?;
    Ok(respond(Entity::User, Outcome::Created, session))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Reply<AuthSession>, AppError> {
    let session = state.accounts.login(req).await?;
    Ok(respond(Entity::User, Outcome::LoggedIn, session))
}
