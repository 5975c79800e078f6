//! Permission catalog and the permission check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every permission the system knows about.
///
/// `FullAccess` is the sentinel that satisfies any check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    FullAccess,

    ViewProducts,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    UpdateInventory,

    ViewOrders,
    CreateOrder,
    UpdateOrderStatus,
    CancelOrder,
    RefundOrder,

    ViewPayments,
    CreatePayment,
    RefundPayment,

    ViewUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
    BanUser,

    ViewReports,
    ExportData,

    ManageRoles,
    ManagePermissions,
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 24] = [
        Permission::FullAccess,
        Permission::ViewProducts,
        Permission::CreateProduct,
        Permission::UpdateProduct,
        Permission::DeleteProduct,
        Permission::UpdateInventory,
        Permission::ViewOrders,
        Permission::CreateOrder,
        Permission::UpdateOrderStatus,
        Permission::CancelOrder,
        Permission::RefundOrder,
        Permission::ViewPayments,
        Permission::CreatePayment,
        Permission::RefundPayment,
        Permission::ViewUsers,
        Permission::CreateUser,
        Permission::UpdateUser,
        Permission::DeleteUser,
        Permission::BanUser,
        Permission::ViewReports,
        Permission::ExportData,
        Permission::ManageRoles,
        Permission::ManagePermissions,
        Permission::ManageSettings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullAccess => "full_access",
            Self::ViewProducts => "view_products",
            Self::CreateProduct => "create_product",
            Self::UpdateProduct => "update_product",
            Self::DeleteProduct => "delete_product",
            Self::UpdateInventory => "update_inventory",
            Self::ViewOrders => "view_orders",
            Self::CreateOrder => "create_order",
            Self::UpdateOrderStatus => "update_order_status",
            Self::CancelOrder => "cancel_order",
            Self::RefundOrder => "refund_order",
            Self::ViewPayments => "view_payments",
            Self::CreatePayment => "create_payment",
            Self::RefundPayment => "refund_payment",
            Self::ViewUsers => "view_users",
            Self::CreateUser => "create_user",
            Self::UpdateUser => "update_user",
            Self::DeleteUser => "delete_user",
            Self::BanUser => "ban_user",
            Self::ViewReports => "view_reports",
            Self::ExportData => "export_data",
            Self::ManageRoles => "manage_roles",
            Self::ManagePermissions => "manage_permissions",
            Self::ManageSettings => "manage_settings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Name of the role every new account receives.
pub const DEFAULT_ROLE: &str = "user";

/// Name of the role holding [`Permission::FullAccess`].
pub const ADMIN_ROLE: &str = "admin";

/// Permissions granted to [`DEFAULT_ROLE`] by the seed.
pub const DEFAULT_ROLE_PERMISSIONS: [Permission; 5] = [
    Permission::ViewProducts,
    Permission::CreateOrder,
    Permission::ViewOrders,
    Permission::CreatePayment,
    Permission::CancelOrder,
];

/// True iff `required` or the full-access sentinel is among `granted`.
///
/// Exact name matches only; there is no wildcard or hierarchy.
pub fn allow(required: &str, granted: &[String]) -> bool {
    granted
        .iter()
        .any(|g| g == required || g == Permission::FullAccess.as_str())
}

/// Identity attached to a request once its bearer token has been verified.
///
/// The permissions are those embedded at issuance; changes to the account's
/// roles only show up after the next login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl AuthContext {
    pub fn allows(&self, required: Permission) -> bool {
        allow(required.as_str(), &self.permissions)
    }
}
