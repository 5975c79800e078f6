//! Static message registry keyed by entity and outcome.

use std::fmt;

use axum::http::StatusCode;

use super::ErrorKind;

/// Entity a message or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Role,
    Permission,
    Authorization,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Permission => "permission",
            Self::Authorization => "authorization",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-facing and developer-facing text for one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub user: String,
    pub dev: String,
}

impl Message {
    fn new(user: &str, dev: &str) -> Self {
        Self {
            user: user.to_string(),
            dev: dev.to_string(),
        }
    }
}

pub fn error(entity: Entity, kind: ErrorKind) -> Message {
    use Entity::*;
    use ErrorKind::*;

    match (entity, kind) {
        (User, NotFound) => Message::new(
            "User not found.",
            "User entity lookup failed in database.",
        ),
        (User, Conflict) => Message::new(
            "User already exists.",
            "Duplicate user email constraint.",
        ),
        (Role, NotFound) => Message::new("Role not found.", "Role ID not found in DB."),
        (Role, Conflict) => Message::new(
            "Role already exists.",
            "Duplicate role name constraint.",
        ),
        (Role, InUse) => Message::new(
            "Role is assigned to one or more users and cannot be deleted.",
            "Role delete blocked: account_roles still references it.",
        ),
        (Permission, Forbidden) => Message::new(
            "You do not have permission to perform this action.",
            "Permission gate denied: required permission not granted by token.",
        ),
        (Authorization, PasswordMismatch) => Message::new(
            "Invalid password. Please check your password and try again.",
            "Password verification failed: password hash mismatch.",
        ),
        (Authorization, Unauthorized) => Message::new(
            "Authorization token is required.",
            "Missing or unusable bearer token.",
        ),
        (_, ValidationFailed) => Message::new(
            "The request is invalid.",
            "Request failed input validation.",
        ),
        (_, Timeout) => Message::new(
            "The request took too long. Please try again.",
            "Store operation exceeded its deadline.",
        ),
        (_, Unavailable) => Message::new(
            "Service temporarily unavailable. Please try again later.",
            "Database connection unavailable.",
        ),
        (entity, kind) => Message {
            user: format!("An unexpected error occurred while processing {}.", entity),
            dev: format!("Unhandled error for {}, kind {}", entity, kind),
        },
    }
}

/// Successful outcomes and the status each one is reported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Fetched,
    Updated,
    Deleted,
    LoggedIn,
}

impl Outcome {
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Created => StatusCode::CREATED,
            Self::Updated => StatusCode::ACCEPTED,
            // deletions carry a body, so 204 is reported as 200
            Self::Fetched | Self::Deleted | Self::LoggedIn => StatusCode::OK,
        }
    }
}

pub fn success(entity: Entity, outcome: Outcome) -> &'static str {
    use Entity::*;
    use Outcome::*;

    match (entity, outcome) {
        (User, Created) => "User registered successfully.",
        (User, Fetched) => "User details fetched successfully.",
        (User, Updated) => "User updated successfully.",
        (User, Deleted) => "User deleted successfully.",
        (User, LoggedIn) => "Login successful. Welcome back!",
        (Role, Created) => "Role created successfully.",
        (Role, Fetched) => "Role details fetched successfully.",
        (Role, Updated) => "Role updated successfully.",
        (Role, Deleted) => "Role deleted successfully.",
        (Permission, Fetched) => "Permissions fetched successfully.",
        _ => "Operation completed successfully.",
    }
}
