//! Authentication and authorization

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{ActorContext, BranchId, UserId};

use crate::error::ApiError;
use crate::middleware::CorrelationId;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Branch the user is working at
    pub branch_id: i64,
    /// User's roles
    pub roles: Vec<String>,
    /// Fine-grained permissions, see [`permissions`]
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Admins hold every permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.roles.iter().any(|r| r == "admin") || self.permissions.iter().any(|p| p == permission)
    }

    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }

    /// Builds the actor for a request made with these claims
    pub fn actor_context(&self) -> Result<ActorContext, AuthError> {
        Ok(ActorContext::new(self.user_id()?, BranchId::new(self.branch_id)))
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `branch_id` - Branch the session is bound to
/// * `roles` - User's roles
/// * `permissions` - Granted permissions
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: UserId,
    branch_id: BranchId,
    roles: Vec<String>,
    permissions: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.value().to_string(),
        branch_id: branch_id.value(),
        roles,
        permissions,
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
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
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

/// Fails with `MissingPermission` unless the claims grant `permission`
pub fn require(claims: &Claims, permission: &str) -> Result<(), AuthError> {
    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission(permission.to_string()))
    }
}

/// Permission definitions
pub mod permissions {
    pub const POS_SESSION: &str = "pos:session";
    pub const POS_CHECKOUT: &str = "pos:checkout";
    pub const POS_PRICE_OVERRIDE: &str = "pos:price_override";
    pub const LEDGER_READ: &str = "ledger:read";
    pub const LEDGER_WRITE: &str = "ledger:write";
    pub const LEDGER_POST: &str = "ledger:post";
    pub const LEDGER_REVERSE: &str = "ledger:reverse";
}

/// The authenticated caller of a protected route
///
/// Extracted from the claims the auth middleware stored on the request.
#[derive(Debug, Clone)]
pub struct Actor {
    pub claims: Claims,
    pub ctx: ActorContext,
}

impl Actor {
    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        require(&self.claims, permission).map_err(ApiError::from)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or(ApiError::Unauthorized)?;

        let mut ctx = claims.actor_context()?;
        if let Some(CorrelationId(id)) = parts.extensions.get::<CorrelationId>() {
            ctx = ctx.with_correlation_id(id.clone());
        }

        Ok(Self { claims, ctx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip_keeps_branch_and_permissions() {
        let token = create_token(
            UserId::new(7),
            BranchId::new(2),
            vec!["cashier".into()],
            vec![permissions::POS_CHECKOUT.into()],
            SECRET,
            60,
        )
        .unwrap();

        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.branch_id, 2);
        assert!(claims.has_permission(permissions::POS_CHECKOUT));
        assert!(!claims.has_permission(permissions::POS_PRICE_OVERRIDE));

        let ctx = claims.actor_context().unwrap();
        assert_eq!(ctx.user_id, UserId::new(7));
        assert_eq!(ctx.branch_id, BranchId::new(2));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token =
            create_token(UserId::new(1), BranchId::new(1), vec![], vec![], SECRET, 60).unwrap();
        assert!(matches!(
            validate_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_admin_holds_every_permission() {
        let claims = Claims {
            sub: "1".into(),
            branch_id: 1,
            roles: vec!["admin".into()],
            permissions: vec![],
            exp: 0,
            iat: 0,
        };
        assert!(require(&claims, permissions::LEDGER_REVERSE).is_ok());
    }

    #[test]
    fn test_non_numeric_subject_is_invalid() {
        let claims = Claims {
            sub: "alice".into(),
            branch_id: 1,
            roles: vec![],
            permissions: vec![],
            exp: 0,
            iat: 0,
        };
        assert!(matches!(claims.actor_context(), Err(AuthError::InvalidToken)));
    }
}
