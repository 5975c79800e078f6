//! Request payloads and their shape validation.
//!
//! Shape rules (presence, length, email format) are checked here before any
//! I/O. Password strength is checked separately by [`crate::password`].

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "must be 2 to 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 100, message = "must be 2 to 100 characters"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Length and strength are left to the password policy
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Body of role create and update.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoleRequest {
    #[serde(alias = "role")]
    #[validate(length(min = 3, max = 50, message = "must be 3 to 50 characters"))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Flatten validator output into one line, fields in name order.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{} {}", field, reason)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Lowercase and trim an email before lookup or storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
