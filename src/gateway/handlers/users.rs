use std::sync::Arc;

use axum::extract::State;

use crate::account::Account;
use crate::errors::{AppError, Entity, Outcome};
use crate::gateway::state::AppState;
use crate::gateway::types::{IdPath, Reply, respond};

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Reply<Vec<Account>>, AppError> {
    let users = state.accounts.list().await?;
    Ok(respond(Entity::User, Outcome::Fetched, users))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Reply<Account>, AppError> {
    let user = state.accounts.get(id).await?;
    Ok(respond(Entity::User, Outcome::Fetched, user))
}
