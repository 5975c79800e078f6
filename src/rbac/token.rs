//! Signed bearer tokens.
//!
//! A token carries the account id, its role names and the flattened
//! permission names of those roles. Verification is stateless: nothing is
//! re-read from the database.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permission::AuthContext;
use crate::account::models::Role;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("no token provided")]
    NoToken,
    #[error("malformed or invalid token: {0}")]
    Malformed(String),
    #[error("token expired")]
    Expired,
}

/// A freshly signed token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(3600);

    pub fn new(secret: &[u8], ttl: std::time::Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is exact: a token past `exp` is expired, no grace window
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::seconds(ttl.as_secs() as i64),
        }
    }

    pub fn issue(
        &self,
        account_id: Uuid,
        roles: &[Role],
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue_at(account_id, roles, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        account_id: Uuid,
        roles: &[Role],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: account_id.to_string(),
            roles: roles.iter().map(|r| r.name.clone()).collect(),
            permissions: roles
                .iter()
                .flat_map(|r| r.permission_names().map(str::to_string))
                .collect(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<AuthContext, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::NoToken);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        let claims = data.claims;
        let account_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| TokenError::Malformed(format!("bad subject: {}", claims.sub)))?;

        Ok(AuthContext {
            account_id,
            roles: claims.roles,
            permissions: claims.permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::models::PermissionRecord;

    const SECRET: &[u8] = b"test-secret-0123456789abcdef0123";

    fn role(name: &str, perms: &[&str]) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            permissions: perms
                .iter()
                .map(|p| PermissionRecord {
                    id: Uuid::new_v4(),
                    name: p.to_string(),
                })
                .collect(),
        }
    }

    fn service() -> TokenService {
        TokenService::new(SECRET, TokenService::DEFAULT_TTL)
    }

    #[test]
    fn test_issue_then_verify() {
        let svc = service();
        let id = Uuid::new_v4();
        let roles = vec![
            role("user", &["view_products", "create_order"]),
            role("auditor", &["view_reports"]),
        ];

        let issued = svc.issue(id, &roles).unwrap();
        let ctx = svc.verify(&issued.token).unwrap();

        assert_eq!(ctx.account_id, id);
        assert_eq!(ctx.roles, vec!["user", "auditor"]);
        assert_eq!(
            ctx.permissions,
            vec!["view_products", "create_order", "view_reports"]
        );
    }

    #[test]
    fn test_expiry_is_one_hour() {
        let svc = service();
        let now = Utc::now();
        let issued = svc.issue_at(Uuid::new_v4(), &[], now).unwrap();
        assert_eq!((issued.expires_at - now).num_seconds(), 3600);
    }

    #[test]
    fn test_expired_token_is_expired_not_malformed() {
        let svc = service();
        let two_hours_ago = Utc::now() - Duration::hours(2);
        let issued = svc
            .issue_at(Uuid::new_v4(), &[role("user", &["view_products"])], two_hours_ago)
            .unwrap();

        assert_eq!(svc.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(service().verify(""), Err(TokenError::NoToken));
        assert_eq!(service().verify("   "), Err(TokenError::NoToken));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            service().verify("not.a.jwt"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let issued = service().issue(Uuid::new_v4(), &[]).unwrap();
        let other = TokenService::new(b"another-secret-entirely-000000000", TokenService::DEFAULT_TTL);
        assert!(matches!(
            other.verify(&issued.token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_algorithm_mismatch_is_malformed() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            roles: vec![],
            permissions: vec!["full_access".into()],
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            service().verify(&token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_uuid_subject_is_malformed() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "42".into(),
            roles: vec![],
            permissions: vec![],
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            service().verify(&token),
            Err(TokenError::Malformed(_))
        ));
    }
}
