//! Data models for accounts, roles and permissions

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Permission row from the catalog table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PermissionRecord {
    pub id: Uuid,
    pub name: String,
}

/// Role with its permissions loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<PermissionRecord>,
}

impl Role {
    pub fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.name.as_str())
    }
}

/// Account with its roles (and their permissions) loaded
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl Account {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    /// Union of permission names across all roles. Not deduplicated.
    pub fn permission_names(&self) -> Vec<String> {
        self.roles
            .iter()
            .flat_map(|r| r.permission_names().map(str::to_string))
            .collect()
    }
}

/// Insert payload; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(name: &str) -> PermissionRecord {
        PermissionRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_permission_names_flatten_roles() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            first_name: "Alice".into(),
            last_name: "Doe".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            created_at: now,
            updated_at: now,
            roles: vec![
                Role {
                    id: Uuid::new_v4(),
                    name: "user".into(),
                    permissions: vec![perm("view_products"), perm("view_orders")],
                },
                Role {
                    id: Uuid::new_v4(),
                    name: "support".into(),
                    permissions: vec![perm("view_orders"), perm("view_users")],
                },
            ],
        };

        assert_eq!(account.role_names(), vec!["user", "support"]);
        assert_eq!(
            account.permission_names(),
            vec!["view_products", "view_orders", "view_orders", "view_users"]
        );
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::nil(),
            first_name: "A".into(),
            last_name: "B".into(),
            email: "a@b.co".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
            roles: vec![],
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
