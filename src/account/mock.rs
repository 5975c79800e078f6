//! In-memory store for tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::models::{Account, NewAccount, PermissionRecord, Role};
use super::repository::{AccountStore, RoleStore, RoleWrite};
use crate::errors::{DbError, DbErrorKind};
use crate::rbac::permission::{ADMIN_ROLE, DEFAULT_ROLE, DEFAULT_ROLE_PERMISSIONS, Permission};

struct StoredAccount {
    account: Account,
    role_ids: Vec<Uuid>,
}

struct StoredRole {
    id: Uuid,
    name: String,
    permission_ids: Vec<Uuid>,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<StoredAccount>,
    roles: Vec<StoredRole>,
    permissions: Vec<PermissionRecord>,
}

impl Inner {
    fn role(&self, stored: &StoredRole) -> Role {
        Role {
            id: stored.id,
            name: stored.name.clone(),
            permissions: self
                .permissions
                .iter()
                .filter(|p| stored.permission_ids.contains(&p.id))
                .cloned()
                .collect(),
        }
    }

    fn account(&self, stored: &StoredAccount) -> Account {
        let mut account = stored.account.clone();
        account.roles = self
            .roles
            .iter()
            .filter(|r| stored.role_ids.contains(&r.id))
            .map(|r| self.role(r))
            .collect();
        account
    }

    fn resolve(&self, names: &[String]) -> (Vec<Uuid>, Vec<String>) {
        let mut ids = Vec::new();
        let mut dropped = Vec::new();
        for name in names {
            match self.permissions.iter().find(|p| &p.name == name) {
                Some(p) if !ids.contains(&p.id) => ids.push(p.id),
                Some(_) => {}
                None => dropped.push(name.clone()),
            }
        }
        (ids, dropped)
    }
}

/// Mock store implementing both store traits
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    /// Every call fails with this kind when set
    fail_with: Mutex<Option<DbErrorKind>>,
    /// Only the named operation fails when set
    fail_op: Mutex<Option<(&'static str, DbErrorKind)>>,
    /// Every call sleeps this long first when set
    delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    /// Empty catalog, no roles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full permission catalog plus the `user` and `admin` roles.
    pub fn seeded() -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            inner.permissions = Permission::ALL
                .iter()
                .map(|p| PermissionRecord {
                    id: Uuid::new_v4(),
                    name: p.as_str().to_string(),
                })
                .collect();
            let names = |ps: &[Permission]| ps.iter().map(|p| p.to_string()).collect::<Vec<_>>();
            let (user_perms, _) = inner.resolve(&names(&DEFAULT_ROLE_PERMISSIONS));
            let (admin_perms, _) = inner.resolve(&names(&[Permission::FullAccess]));
            inner.roles.push(StoredRole {
                id: Uuid::new_v4(),
                name: DEFAULT_ROLE.to_string(),
                permission_ids: user_perms,
            });
            inner.roles.push(StoredRole {
                id: Uuid::new_v4(),
                name: ADMIN_ROLE.to_string(),
                permission_ids: admin_perms,
            });
        }
        store
    }

    pub fn fail_with(&self, kind: Option<DbErrorKind>) {
        *self.fail_with.lock().unwrap() = kind;
    }

    /// Fail one store operation, e.g. `roles.delete`, leaving the rest working.
    pub fn fail_on(&self, op: &'static str, kind: DbErrorKind) {
        *self.fail_op.lock().unwrap() = Some((op, kind));
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Attach a role to an existing account.
    pub fn grant(&self, account_id: Uuid, role_id: Uuid) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(acc) = inner.accounts.iter_mut().find(|a| a.account.id == account_id) {
            acc.role_ids.push(role_id);
        }
    }

    async fn enter(&self, op: &'static str) -> Result<(), DbError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Some(kind) = *self.fail_with.lock().unwrap() {
            return Err(DbError::new(kind, op, "injected failure"));
        }
        match *self.fail_op.lock().unwrap() {
            Some((target, kind)) if target == op => {
                Err(DbError::new(kind, op, "injected failure"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        self.enter("accounts.find_by_email").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .iter()
            .find(|a| a.account.email == email)
            .map(|a| inner.account(a)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DbError> {
        self.enter("accounts.find_by_id").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .iter()
            .find(|a| a.account.id == id)
            .map(|a| inner.account(a)))
    }

    async fn list(&self) -> Result<Vec<Account>, DbError> {
        self.enter("accounts.list").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.iter().map(|a| inner.account(a)).collect())
    }

    async fn create_with_role(
        &self,
        account: NewAccount,
        role: &Role,
    ) -> Result<Account, DbError> {
        const OP: &str = "accounts.create_with_role";
        self.enter(OP).await?;
        let mut inner = self.inner.lock().unwrap();
        if inner.accounts.iter().any(|a| a.account.email == account.email) {
            return Err(DbError::new(
                DbErrorKind::Conflict,
                OP,
                "duplicate key value violates unique constraint \"accounts_email_key\"",
            ));
        }
        if !inner.roles.iter().any(|r| r.id == role.id) {
            return Err(DbError::new(
                DbErrorKind::BadRequest,
                OP,
                "violates foreign key constraint \"account_roles_role_id_fkey\"",
            ));
        }

        let now = Utc::now();
        let stored = StoredAccount {
            account: Account {
                id: account.id,
                first_name: account.first_name,
                last_name: account.last_name,
                email: account.email,
                password_hash: account.password_hash,
                created_at: now,
                updated_at: now,
                roles: Vec::new(),
            },
            role_ids: vec![role.id],
        };
        let created = inner.account(&stored);
        inner.accounts.push(stored);
        Ok(created)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn list_roles(&self) -> Result<Vec<Role>, DbError> {
        self.enter("roles.list").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.roles.iter().map(|r| inner.role(r)).collect())
    }

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, DbError> {
        self.enter("roles.find").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.roles.iter().find(|r| r.id == id).map(|r| inner.role(r)))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DbError> {
        self.enter("roles.find_by_name").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .roles
            .iter()
            .find(|r| r.name == name)
            .map(|r| inner.role(r)))
    }

    async fn create_role(
        &self,
        id: Uuid,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleWrite, DbError> {
        const OP: &str = "roles.create";
        self.enter(OP).await?;
        let mut inner = self.inner.lock().unwrap();
        if inner.roles.iter().any(|r| r.name == name) {
            return Err(DbError::new(
                DbErrorKind::Conflict,
                OP,
                "duplicate key value violates unique constraint \"roles_name_key\"",
            ));
        }
        let (permission_ids, dropped) = inner.resolve(permissions);
        let stored = StoredRole {
            id,
            name: name.to_string(),
            permission_ids,
        };
        let role = inner.role(&stored);
        inner.roles.push(stored);
        Ok(RoleWrite { role, dropped })
    }

    async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleWrite, DbError> {
        const OP: &str = "roles.update";
        self.enter(OP).await?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.roles.iter().any(|r| r.id == id) {
            return Err(DbError::not_found(OP));
        }
        if inner.roles.iter().any(|r| r.name == name && r.id != id) {
            return Err(DbError::new(
                DbErrorKind::Conflict,
                OP,
                "duplicate key value violates unique constraint \"roles_name_key\"",
            ));
        }
        let (permission_ids, dropped) = inner.resolve(permissions);
        let Some(stored) = inner.roles.iter_mut().find(|r| r.id == id) else {
            return Err(DbError::not_found(OP));
        };
        stored.name = name.to_string();
        stored.permission_ids = permission_ids;

        let inner = &*inner;
        let role = inner
            .roles
            .iter()
            .find(|r| r.id == id)
            .map(|r| inner.role(r))
            .ok_or_else(|| DbError::not_found(OP))?;
        Ok(RoleWrite { role, dropped })
    }

    async fn count_role_holders(&self, id: Uuid) -> Result<i64, DbError> {
        self.enter("roles.count_holders").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .iter()
            .filter(|a| a.role_ids.contains(&id))
            .count() as i64)
    }

    async fn delete_role(&self, id: Uuid) -> Result<(), DbError> {
        const OP: &str = "roles.delete";
        self.enter(OP).await?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.roles.len();
        inner.roles.retain(|r| r.id != id);
        if inner.roles.len() == before {
            return Err(DbError::not_found(OP));
        }
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, DbError> {
        self.enter("permissions.list").await?;
        let inner = self.inner.lock().unwrap();
        let mut perms = inner.permissions.clone();
        perms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(perms)
    }
}
