//! shop_backend - accounts and role-based access control
//!
//! # Modules
//!
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool, migrations and seeding
//! - [`errors`] - error taxonomy, DB error classification, message registry
//! - [`password`] - password policy, hashing and verification
//! - [`rbac`] - permission catalog, bearer tokens, auth middleware
//! - [`account`] - account and role services over the store seams
//! - [`gateway`] - HTTP router, handlers and response envelope

pub mod config;
pub mod logging;

pub mod db;
pub mod errors;

pub mod account;
pub mod password;
pub mod rbac;

pub mod gateway;

// Convenient re-exports at crate root
pub use account::{AccountService, RoleService};
pub use errors::{AppError, ErrorKind};
pub use rbac::{AuthContext, Permission, TokenService, allow};
