use std::sync::Arc;

use crate::account::{AccountService, RoleService};
use crate::db::Database;
use crate::rbac::TokenService;

/// Shared gateway state, built once at startup and passed to the router
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub roles: Arc<RoleService>,
    pub tokens: Arc<TokenService>,
    /// PostgreSQL pool for the health probe; absent when running on a
    /// non-database store
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        accounts: Arc<AccountService>,
        roles: Arc<RoleService>,
        tokens: Arc<TokenService>,
        db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            accounts,
            roles,
            tokens,
            db,
        }
    }
}
