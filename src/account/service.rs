//! Account registration, login and lookup.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use super::models::{Account, NewAccount};
use super::repository::{AccountStore, RoleStore};
use super::validation::{LoginRequest, RegisterRequest, describe, normalize_email};
use crate::config::Deadlines;
use crate::errors::db::with_deadline;
use crate::errors::{AppError, Entity, ErrorKind};
use crate::password::{self, PasswordError};
use crate::rbac::permission::DEFAULT_ROLE;
use crate::rbac::token::{IssuedToken, TokenService};

/// Account plus a freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub account: Account,
}

impl AuthSession {
    fn new(issued: IssuedToken, account: Account) -> Self {
        Self {
            token: issued.token,
            expires_at: issued.expires_at,
            account,
        }
    }
}

pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    roles: Arc<dyn RoleStore>,
    tokens: Arc<TokenService>,
    deadlines: Deadlines,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        roles: Arc<dyn RoleStore>,
        tokens: Arc<TokenService>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            accounts,
            roles,
            tokens,
            deadlines,
        }
    }

    /// Create an account holding the default role and sign it in.
    ///
    /// The insert and the role assignment share one transaction, so a
    /// failure leaves no account behind.
    pub async fn register(&self, input: RegisterRequest) -> Result<AuthSession, AppError> {
        input
            .validate()
            .map_err(|e| AppError::validation(Entity::User, describe(&e)))?;
        password::validate(&input.password)
            .map_err(|v| AppError::validation(Entity::User, v.to_string()))?;

        let email = normalize_email(&input.email);
        let existing = with_deadline(
            self.deadlines.read,
            "accounts.find_by_email",
            self.accounts.find_by_email(&email),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::User, e))?;
        if existing.is_some() {
            return Err(AppError::new(Entity::User, ErrorKind::Conflict));
        }

        let role = with_deadline(
            self.deadlines.read,
            "roles.find_by_name",
            self.roles.find_role_by_name(DEFAULT_ROLE),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::Role, e))?
        .ok_or_else(|| {
            AppError::internal(
                Entity::Role,
                format!("default role '{}' is missing; run --seed", DEFAULT_ROLE),
            )
        })?;

        let password_hash = password::hash(&input.password)
            .map_err(|e| AppError::internal(Entity::User, e))?;

        let new_account = NewAccount {
            id: Uuid::new_v4(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email,
            password_hash,
        };

        // a concurrent registration with the same email loses on the unique
        // constraint and surfaces as Conflict
        let account = with_deadline(
            self.deadlines.write,
            "accounts.create_with_role",
            self.accounts.create_with_role(new_account, &role),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::User, e))?;

        let issued = self
            .tokens
            .issue(account.id, &account.roles)
            .map_err(|e| AppError::internal(Entity::Authorization, e))?;

        tracing::info!(account_id = %account.id, role = DEFAULT_ROLE, "account registered");
        Ok(AuthSession::new(issued, account))
    }

    pub async fn login(&self, input: LoginRequest) -> Result<AuthSession, AppError> {
        input
            .validate()
            .map_err(|e| AppError::validation(Entity::User, describe(&e)))?;

        let email = normalize_email(&input.email);
        let account = with_deadline(
            self.deadlines.read,
            "accounts.find_by_email",
            self.accounts.find_by_email(&email),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::User, e))?
        .ok_or_else(|| AppError::new(Entity::User, ErrorKind::NotFound))?;

        password::verify(&input.password, &account.password_hash).map_err(|e| match e {
            PasswordError::Mismatch => {
                tracing::info!(account_id = %account.id, "login rejected: password mismatch");
                AppError::new(Entity::Authorization, ErrorKind::PasswordMismatch)
            }
            PasswordError::Hash(detail) => AppError::internal(Entity::Authorization, detail),
        })?;

        let issued = self
            .tokens
            .issue(account.id, &account.roles)
            .map_err(|e| AppError::internal(Entity::Authorization, e))?;

        tracing::info!(account_id = %account.id, roles = ?account.role_names(), "login succeeded");
        Ok(AuthSession::new(issued, account))
    }

    pub async fn list(&self) -> Result<Vec<Account>, AppError> {
        with_deadline(self.deadlines.read, "accounts.list", self.accounts.list())
            .await
            .map_err(|e| AppError::from_db(Entity::User, e))
    }

    pub async fn get(&self, id: Uuid) -> Result<Account, AppError> {
        with_deadline(
            self.deadlines.read,
            "accounts.find_by_id",
            self.accounts.find_by_id(id),
        )
        .await
        .map_err(|e| AppError::from_db(Entity::User, e))?
        .ok_or_else(|| AppError::new(Entity::User, ErrorKind::NotFound))
    }
}
