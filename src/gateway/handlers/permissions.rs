use std::sync::Arc;

use axum::extract::State;

use crate::account::PermissionRecord;
use crate::errors::{AppError, Entity, Outcome};
use crate::gateway::state::AppState;
use crate::gateway::types::{Reply, respond};

/// GET /api/v1/permissions
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
) -> Result<Reply<Vec<PermissionRecord>>, AppError> {
    let permissions = state.roles.list_permissions().await?;
    Ok(respond(Entity::Permission, Outcome::Fetched, permissions))
}
