//! Role-based access control: permission catalog, bearer tokens and the
//! middleware that enforces both.

pub mod error;
pub mod middleware;
pub mod permission;
pub mod token;

pub use error::{AuthError, AuthErrorCode};
pub use middleware::{jwt_auth_middleware, require_permission};
pub use permission::{AuthContext, Permission, allow};
pub use token::{Claims, IssuedToken, TokenError, TokenService};
