//! Store seams for accounts and roles, and their PostgreSQL implementation.
//!
//! Stores report [`DbError`]s and know nothing about deadlines or HTTP;
//! the services wrap every call in a deadline and map errors per entity.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::models::{Account, NewAccount, PermissionRecord, Role};
use crate::errors::DbError;

/// Result of a role write: the stored role and the requested permission
/// names that matched nothing in the catalog.
#[derive(Debug, Clone)]
pub struct RoleWrite {
    pub role: Role,
    pub dropped: Vec<String>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DbError>;

    async fn list(&self) -> Result<Vec<Account>, DbError>;

    /// Insert the account and attach `role` in one transaction.
    async fn create_with_role(&self, account: NewAccount, role: &Role)
    -> Result<Account, DbError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn list_roles(&self) -> Result<Vec<Role>, DbError>;

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, DbError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DbError>;

    /// Insert a role with the catalog permissions among `permissions`.
    /// Unknown names are dropped and reported in [`RoleWrite::dropped`].
    async fn create_role(
        &self,
        id: Uuid,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleWrite, DbError>;

    /// Clear associations, rename, re-associate. All or nothing.
    /// A missing role is [`DbErrorKind::NotFound`](crate::errors::DbErrorKind::NotFound).
    async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleWrite, DbError>;

    /// Number of accounts currently holding the role.
    async fn count_role_holders(&self, id: Uuid) -> Result<i64, DbError>;

    /// Clear permission associations and delete the role.
    async fn delete_role(&self, id: Uuid) -> Result<(), DbError>;

    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, DbError>;
}

/// PostgreSQL-backed store implementing both seams.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roles_for_accounts(
        &self,
        op: &'static str,
        account_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Role>>, DbError> {
        let rows = sqlx::query(
            r#"SELECT ar.account_id, r.id AS role_id, r.name AS role_name,
                      p.id AS permission_id, p.name AS permission_name
               FROM account_roles ar
               JOIN roles r ON r.id = ar.role_id
               LEFT JOIN role_permissions rp ON rp.role_id = r.id
               LEFT JOIN permissions p ON p.id = rp.permission_id
               WHERE ar.account_id = ANY($1)
               ORDER BY r.name, p.name"#,
        )
        .bind(account_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::classify(op, &e))?;

        let mut grouped: HashMap<Uuid, Vec<PgRow>> = HashMap::new();
        for row in rows {
            let account_id: Uuid = row
                .try_get("account_id")
                .map_err(|e| DbError::classify(op, &e))?;
            grouped.entry(account_id).or_default().push(row);
        }

        grouped
            .into_iter()
            .map(|(id, rows)| fold_roles(op, &rows).map(|roles| (id, roles)))
            .collect()
    }

    async fn load_roles(
        &self,
        op: &'static str,
        filter: RoleFilter<'_>,
    ) -> Result<Vec<Role>, DbError> {
        const SELECT: &str = r#"SELECT r.id AS role_id, r.name AS role_name,
                      p.id AS permission_id, p.name AS permission_name
               FROM roles r
               LEFT JOIN role_permissions rp ON rp.role_id = r.id
               LEFT JOIN permissions p ON p.id = rp.permission_id"#;

        let sql = match filter {
            RoleFilter::All => format!("{SELECT} ORDER BY r.name, p.name"),
            RoleFilter::Id(_) => format!("{SELECT} WHERE r.id = $1 ORDER BY r.name, p.name"),
            RoleFilter::Name(_) => format!("{SELECT} WHERE r.name = $1 ORDER BY r.name, p.name"),
        };
        let query = match filter {
            RoleFilter::All => sqlx::query(&sql),
            RoleFilter::Id(id) => sqlx::query(&sql).bind(id),
            RoleFilter::Name(name) => sqlx::query(&sql).bind(name),
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbError::classify(op, &e))?;
        fold_roles(op, &rows)
    }

    async fn hydrate(&self, op: &'static str, rows: Vec<PgRow>) -> Result<Vec<Account>, DbError> {
        let mut accounts = rows
            .iter()
            .map(|r| account_from_row(op, r))
            .collect::<Result<Vec<_>, _>>()?;
        if accounts.is_empty() {
            return Ok(accounts);
        }

        let ids: Vec<Uuid> = accounts.iter().map(|a| a.id).collect();
        let mut roles = self.roles_for_accounts(op, &ids).await?;
        for account in &mut accounts {
            account.roles = roles.remove(&account.id).unwrap_or_default();
        }
        Ok(accounts)
    }

    /// Resolve names against the catalog inside `tx` and attach them to `role_id`.
    async fn associate(
        op: &'static str,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        role_id: Uuid,
        names: &[String],
    ) -> Result<(Vec<PermissionRecord>, Vec<String>), DbError> {
        let found: Vec<PermissionRecord> = sqlx::query_as(
            r#"SELECT id, name FROM permissions WHERE name = ANY($1) ORDER BY name"#,
        )
        .bind(names)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| DbError::classify(op, &e))?;

        let known: HashSet<&str> = found.iter().map(|p| p.name.as_str()).collect();
        let dropped = unknown_names(&known, names);

        if !found.is_empty() {
            let ids: Vec<Uuid> = found.iter().map(|p| p.id).collect();
            sqlx::query(
                r#"INSERT INTO role_permissions (role_id, permission_id)
                   SELECT $1, UNNEST($2::uuid[])
                   ON CONFLICT DO NOTHING"#,
            )
            .bind(role_id)
            .bind(&ids)
            .execute(&mut **tx)
            .await
            .map_err(|e| DbError::classify(op, &e))?;
        }

        Ok((found, dropped))
    }
}

/// Requested names missing from `known`, first occurrence order, no repeats.
fn unknown_names(known: &HashSet<&str>, names: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    names
        .iter()
        .filter(|n| !known.contains(n.as_str()) && seen.insert(n.as_str()))
        .cloned()
        .collect()
}

#[derive(Clone, Copy)]
enum RoleFilter<'a> {
    All,
    Id(Uuid),
    Name(&'a str),
}

fn account_from_row(op: &'static str, r: &PgRow) -> Result<Account, DbError> {
    let get = |e: sqlx::Error| DbError::classify(op, &e);
    Ok(Account {
        id: r.try_get("id").map_err(get)?,
        first_name: r.try_get("first_name").map_err(get)?,
        last_name: r.try_get("last_name").map_err(get)?,
        email: r.try_get("email").map_err(get)?,
        password_hash: r.try_get("password_hash").map_err(get)?,
        created_at: r.try_get("created_at").map_err(get)?,
        updated_at: r.try_get("updated_at").map_err(get)?,
        roles: Vec::new(),
    })
}

/// Fold `(role, permission?)` rows, already ordered by role, into roles.
fn fold_roles(op: &'static str, rows: &[PgRow]) -> Result<Vec<Role>, DbError> {
    let get = |e: sqlx::Error| DbError::classify(op, &e);
    let mut roles: Vec<Role> = Vec::new();

    for row in rows {
        let role_id: Uuid = row.try_get("role_id").map_err(get)?;
        if roles.last().map(|r| r.id) != Some(role_id) {
            roles.push(Role {
                id: role_id,
                name: row.try_get("role_name").map_err(get)?,
                permissions: Vec::new(),
            });
        }

        let permission_id: Option<Uuid> = row.try_get("permission_id").map_err(get)?;
        let permission_name: Option<String> = row.try_get("permission_name").map_err(get)?;
        if let (Some(id), Some(name), Some(role)) = (permission_id, permission_name, roles.last_mut())
        {
            role.permissions.push(PermissionRecord { id, name });
        }
    }

    Ok(roles)
}

const ACCOUNT_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, created_at, updated_at";

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        const OP: &str = "accounts.find_by_email";
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::classify(OP, &e))?;

        Ok(self.hydrate(OP, rows).await?.into_iter().next())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DbError> {
        const OP: &str = "accounts.find_by_id";
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::classify(OP, &e))?;

        Ok(self.hydrate(OP, rows).await?.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Account>, DbError> {
        const OP: &str = "accounts.list";
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY created_at",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::classify(OP, &e))?;

        self.hydrate(OP, rows).await
    }

    async fn create_with_role(
        &self,
        account: NewAccount,
        role: &Role,
    ) -> Result<Account, DbError> {
        const OP: &str = "accounts.create_with_role";
        let err = |e: sqlx::Error| DbError::classify(OP, &e);

        let mut tx = self.pool.begin().await.map_err(err)?;

        let row = sqlx::query(
            r#"INSERT INTO accounts (id, first_name, last_name, email, password_hash)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING created_at, updated_at"#,
        )
        .bind(account.id)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(err)?;

        sqlx::query("INSERT INTO account_roles (account_id, role_id) VALUES ($1, $2)")
            .bind(account.id)
            .bind(role.id)
            .execute(&mut *tx)
            .await
            .map_err(err)?;

        tx.commit().await.map_err(err)?;

        Ok(Account {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            password_hash: account.password_hash,
            created_at: row.try_get("created_at").map_err(err)?,
            updated_at: row.try_get("updated_at").map_err(err)?,
            roles: vec![role.clone()],
        })
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn list_roles(&self) -> Result<Vec<Role>, DbError> {
        self.load_roles("roles.list", RoleFilter::All).await
    }

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, DbError> {
        Ok(self
            .load_roles("roles.find", RoleFilter::Id(id))
            .await?
            .into_iter()
            .next())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DbError> {
        Ok(self
            .load_roles("roles.find_by_name", RoleFilter::Name(name))
            .await?
            .into_iter()
            .next())
    }

    async fn create_role(
        &self,
        id: Uuid,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleWrite, DbError> {
        const OP: &str = "roles.create";
        let err = |e: sqlx::Error| DbError::classify(OP, &e);

        let mut tx = self.pool.begin().await.map_err(err)?;

        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(err)?;

        let (found, dropped) = Self::associate(OP, &mut tx, id, permissions).await?;
        tx.commit().await.map_err(err)?;

        Ok(RoleWrite {
            role: Role {
                id,
                name: name.to_string(),
                permissions: found,
            },
            dropped,
        })
    }

    async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        permissions: &[String],
    ) -> Result<RoleWrite, DbError> {
        const OP: &str = "roles.update";
        let err = |e: sqlx::Error| DbError::classify(OP, &e);

        let mut tx = self.pool.begin().await.map_err(err)?;

        let exists = sqlx::query("SELECT 1 FROM roles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(err)?;
        if exists.is_none() {
            return Err(DbError::not_found(OP));
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(err)?;

        sqlx::query("UPDATE roles SET name = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(err)?;

        let (found, dropped) = Self::associate(OP, &mut tx, id, permissions).await?;
        tx.commit().await.map_err(err)?;

        Ok(RoleWrite {
            role: Role {
                id,
                name: name.to_string(),
                permissions: found,
            },
            dropped,
        })
    }

    async fn count_role_holders(&self, id: Uuid) -> Result<i64, DbError> {
        const OP: &str = "roles.count_holders";
        let row = sqlx::query("SELECT COUNT(*) AS holders FROM account_roles WHERE role_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::classify(OP, &e))?;
        row.try_get("holders")
            .map_err(|e| DbError::classify(OP, &e))
    }

    async fn delete_role(&self, id: Uuid) -> Result<(), DbError> {
        const OP: &str = "roles.delete";
        let err = |e: sqlx::Error| DbError::classify(OP, &e);

        let mut tx = self.pool.begin().await.map_err(err)?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(err)?;

        // account_roles references roles ON DELETE RESTRICT, so a holder
        // added since the count check fails here with a FK violation
        let deleted = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(err)?;
        if deleted.rows_affected() == 0 {
            return Err(DbError::not_found(OP));
        }

        tx.commit().await.map_err(err)?;
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<PermissionRecord>, DbError> {
        sqlx::query_as("SELECT id, name FROM permissions ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbError::classify("permissions.list", &e))
    }
}
