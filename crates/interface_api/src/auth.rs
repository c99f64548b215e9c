//! Authentication and authorization
//!
//! Tokens identify the issuer: the `sub` claim is the issuer id every
//! request is scoped to. Session handling lives outside this service; all it
//! needs is a token signed with the shared secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::IssuerId;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (issuer ID)
    pub sub: String,
    /// Caller's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not an issuer id")]
    InvalidSubject,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// The authenticated caller, attached to each request by the auth middleware
#[derive(Debug, Clone)]
pub struct Caller {
    pub issuer_id: IssuerId,
    pub claims: Claims,
}

impl Caller {
    pub fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let uuid = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(Self {
            issuer_id: IssuerId::from_uuid(uuid),
            claims,
        })
    }

    pub fn require(&self, permission: &str) -> Result<(), AuthError> {
        if has_role(&self.claims, permission) {
            Ok(())
        } else {
            Err(AuthError::MissingPermission(permission.to_string()))
        }
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `issuer_id` - Issuer the token acts for
/// * `roles` - Granted roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    issuer_id: IssuerId,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: issuer_id.as_uuid().to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if the caller has the required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == "admin")
}

/// Permission definitions
pub mod permissions {
    pub const INVOICE_READ: &str = "invoice:read";
    pub const INVOICE_WRITE: &str = "invoice:write";
    /// Issuing, cancelling and rectifying have legal effect
    pub const INVOICE_ISSUE: &str = "invoice:issue";
    pub const PAYMENT_WRITE: &str = "payment:write";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip_resolves_issuer() {
        let issuer = IssuerId::new();
        let token = create_token(issuer, vec![permissions::INVOICE_READ.to_string()], SECRET, 60).unwrap();

        let caller = Caller::from_claims(validate_token(&token, SECRET).unwrap()).unwrap();

        assert_eq!(caller.issuer_id, issuer);
        assert!(caller.require(permissions::INVOICE_READ).is_ok());
        assert!(matches!(
            caller.require(permissions::INVOICE_ISSUE),
            Err(AuthError::MissingPermission(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token(IssuerId::new(), vec![], SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let claims = Claims {
            sub: "alice".to_string(),
            roles: vec!["admin".to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(Caller::from_claims(claims), Err(AuthError::InvalidSubject)));
    }

    #[test]
    fn test_admin_has_every_permission() {
        let claims = Claims {
            sub: Uuid::now_v7().to_string(),
            roles: vec!["admin".to_string()],
            exp: 0,
            iat: 0,
        };
        assert!(has_role(&claims, permissions::PAYMENT_WRITE));
    }
}
