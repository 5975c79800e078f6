//! Account management module
//!
//! Accounts, roles and the permission catalog: models, store seams with
//! their PostgreSQL implementation, and the services on top.

#[cfg(test)]
pub mod mock;
pub mod models;
pub mod repository;
pub mod roles;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use models::{Account, NewAccount, PermissionRecord, Role};
pub use repository::{AccountStore, PgStore, RoleStore, RoleWrite};
pub use roles::RoleService;
pub use service::{AccountService, AuthSession};
pub use validation::{LoginRequest, RegisterRequest, RoleRequest};
