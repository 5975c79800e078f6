//! Role and permission administration.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::models::{PermissionRecord, Role};
use super::repository::RoleStore;
use super::validation::{RoleRequest, describe};
use crate::config::Deadlines;
use crate::errors::db::with_deadline;
use crate::errors::{AppError, Entity, ErrorKind};

pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    deadlines: Deadlines,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleStore>, deadlines: Deadlines) -> Self {
        Self { roles, deadlines }
    }

    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        with_deadline(self.deadlines.read, "roles.list", self.roles.list_roles())
            .await
            .map_err(|e| AppError::from_db(Entity::Role, e))
    }

    pub async fn get(&self, id: Uuid) -> Result<Role, AppError> {
        with_deadline(self.deadlines.read, "roles.find", self.roles.find_role(id))
            .await
            .map_err(|e| AppError::from_db(Entity::Role, e))?
            .ok_or_else(|| AppError::new(Entity::Role, ErrorKind::NotFound))
    }

    /// Create a role. Permission names outside the catalog are ignored.
    pub async fn create(&self, input: RoleRequest) -> Result<Role, AppError> {
        input
            .validate()
            .map_err(|e| AppError::validation(Entity::Role, describe(&e)))?;
        let name = input.name.trim();

        let existing = with_deadline(
            self.deadlines.read,
            "roles.find_by_name",
            self.roles.find_role_by_name(name),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::Role, e))?;
        if existing.is_some() {
            return Err(AppError::new(Entity::Role, ErrorKind::Conflict));
        }

        let written = with_deadline(
            self.deadlines.write,
            "roles.create",
            self.roles.create_role(Uuid::new_v4(), name, &input.permissions),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::Role, e))?;

        if !written.dropped.is_empty() {
            tracing::warn!(
                role_id = %written.role.id,
                dropped = ?written.dropped,
                "unknown permission names ignored on role create"
            );
        }
        tracing::info!(role_id = %written.role.id, role = %written.role.name, "role created");
        Ok(written.role)
    }

    /// Replace the name and permission set of a role.
    pub async fn update(&self, id: Uuid, input: RoleRequest) -> Result<Role, AppError> {
        input
            .validate()
            .map_err(|e| AppError::validation(Entity::Role, describe(&e)))?;

        let written = with_deadline(
            self.deadlines.write,
            "roles.update",
            self.roles
                .update_role(id, input.name.trim(), &input.permissions),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::Role, e))?;

        if !written.dropped.is_empty() {
            tracing::warn!(
                role_id = %id,
                dropped = ?written.dropped,
                "unknown permission names ignored on role update"
            );
        }
        tracing::info!(role_id = %id, role = %written.role.name, "role updated");
        Ok(written.role)
    }

    /// Delete a role nobody holds.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let role = self.get(id).await?;

        let holders = with_deadline(
            self.deadlines.read,
            "roles.count_holders",
            self.roles.count_role_holders(id),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::Role, e))?;
        if holders > 0 {
            tracing::info!(role_id = %id, holders, "role delete blocked");
            return Err(AppError::new(Entity::Role, ErrorKind::InUse)
                .with_detail(format!("{} account(s) hold role {}", holders, role.name)));
        }

        with_deadline(
            self.deadlines.write,
            "roles.delete",
            self.roles.delete_role(id),
        )
        .await
        .map_err(|e| match e.kind {
            // a holder appeared between the count and the delete
            crate::errors::DbErrorKind::BadRequest => {
                AppError::new(Entity::Role, ErrorKind::InUse).with_detail(e)
            }
            _ => AppError::from_db(Entity::Role, e),
        })?;

        tracing::info!(role_id = %id, role = %role.name, "role deleted");
        Ok(())
    }

    pub async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, AppError> {
        with_deadline(
            self.deadlines.read,
            "permissions.list",
            self.roles.list_permissions(),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::Permission, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::mock::MemoryStore;
    use crate::account::models::NewAccount;
    use crate::account::repository::AccountStore;
    use crate::errors::DbErrorKind;
    use crate::rbac::permission::Permission;

    fn service() -> (RoleService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::seeded());
        (RoleService::new(store.clone(), Deadlines::default()), store)
    }

    fn request(name: &str, permissions: &[&str]) -> RoleRequest {
        RoleRequest {
            name: name.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn names(role: &Role) -> Vec<&str> {
        let mut v: Vec<&str> = role.permission_names().collect();
        v.sort();
        v
    }

    #[tokio::test]
    async fn test_create_drops_unknown_permissions() {
        let (svc, _) = service();
        let role = svc
            .create(request(
                "support",
                &["view_orders", "view_usres", "view_users"],
            ))
            .await
            .unwrap();

        assert_eq!(role.name, "support");
        assert_eq!(names(&role), vec!["view_orders", "view_users"]);
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let (svc, _) = service();
        let err = svc.create(request("user", &[])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_create_rejects_short_name() {
        let (svc, _) = service();
        let err = svc.create(request("ab", &[])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_update_replaces_permission_set() {
        let (svc, _) = service();
        let role = svc
            .create(request("support", &["view_orders"]))
            .await
            .unwrap();

        let updated = svc
            .update(role.id, request("support_lead", &["view_reports", "export_data"]))
            .await
            .unwrap();
        assert_eq!(updated.name, "support_lead");
        assert_eq!(names(&updated), vec!["export_data", "view_reports"]);

        let fetched = svc.get(role.id).await.unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (svc, _) = service();
        let err = svc
            .update(Uuid::new_v4(), request("ghost", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_in_use_leaves_role_intact() {
        let (svc, store) = service();
        let role = svc
            .create(request("support", &["view_orders"]))
            .await
            .unwrap();
        store
            .create_with_role(
                NewAccount {
                    id: Uuid::new_v4(),
                    first_name: "Bob".into(),
                    last_name: "Roe".into(),
                    email: "bob@example.com".into(),
                    password_hash: "x".into(),
                },
                &role,
            )
            .await
            .unwrap();

        let err = svc.delete(role.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InUse);
        assert_eq!(err.http_status().as_u16(), 409);

        let still = svc.get(role.id).await.unwrap();
        assert_eq!(names(&still), vec!["view_orders"]);
    }

    #[tokio::test]
    async fn test_delete_racing_new_holder_is_in_use() {
        let (svc, store) = service();
        let role = svc.create(request("support", &[])).await.unwrap();
        // holder count sees none, then the delete trips the foreign key
        store.fail_on("roles.delete", DbErrorKind::BadRequest);

        let err = svc.delete(role.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InUse);
        assert_eq!(err.http_status().as_u16(), 409);
        assert!(svc.get(role.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unused_role() {
        let (svc, _) = service();
        let role = svc.create(request("temp_role", &[])).await.unwrap();
        svc.delete(role.id).await.unwrap();

        let err = svc.get(role.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = svc.delete(role.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_permissions_is_catalog() {
        let (svc, _) = service();
        let perms = svc.list_permissions().await.unwrap();
        assert_eq!(perms.len(), Permission::ALL.len());
        assert!(perms.iter().any(|p| p.name == "full_access"));
    }
}
