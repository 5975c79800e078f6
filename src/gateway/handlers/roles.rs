use std::sync::Arc;

use axum::extract::State;

use crate::account::{Role, RoleRequest};
use crate::errors::{AppError, Entity, Outcome};
use crate::gateway::state::AppState;
use crate::gateway::types::{IdPath, JsonBody, Reply, respond, respond_empty};

pub async fn list_roles(State(state): State<Arc<AppState>>) -> Result<Reply<Vec<Role>>, AppError> {
    let roles = state.roles.list().await?;
    Ok(respond(Entity::Role, Outcome::Fetched, roles))
}

pub async fn get_role(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Reply<Role>, AppError> {
    let role = state.roles.get(id).await?;
    Ok(respond(Entity::Role, Outcome::Fetched, role))
}

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RoleRequest>,
) -> Result<Reply<Role>, AppError> {
    let role = state.roles.create(req).await?;
    Ok(respond(Entity::Role, Outcome::Created, role))
}

/// Replies 202 on success.
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    JsonBody(req): JsonBody<RoleRequest>,
) -> Result<Reply<Role>, AppError> {
    let role = state.roles.update(id, req).await?;
    Ok(respond(Entity::Role, Outcome::Updated, role))
}

pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Reply<()>, AppError> {
    state.roles.delete(id).await?;
    Ok(respond_empty(Entity::Role, Outcome::Deleted))
}
