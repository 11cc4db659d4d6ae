//! JWT authentication module.
//!
//! Validates the dashboard's bearer token and turns its claims into an
//! [`Identity`]. Tokens are issued by the platform's login flow; this
//! server only signs tokens for tests and local tooling.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! AuthUser extractor ──► JwtManager::validate_token ──► Claims ──► Identity
//!        │
//!        └── missing / malformed / expired ──► 401 "Authentication required"
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tally_core::{Identity, Role};

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Company the user belongs to; absent for platform admins
    #[serde(default)]
    pub company_id: Option<String>,

    /// Role name as stored by the platform
    #[serde(default)]
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub.clone(),
            company_id: self.company_id.clone().filter(|c| !c.trim().is_empty()),
            role: self.role.parse().unwrap_or(Role::Staff),
        }
    }
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: impl Into<String>, lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            lifetime_secs,
        }
    }

    /// Generate a token for an identity.
    pub fn generate_token(&self, identity: &Identity) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: identity.user_id.clone(),
            company_id: identity.company_id.clone(),
            role: identity.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Rejected token");
            ApiError::Unauthenticated
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated caller of a handler.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token);

        let Some(token) = token else {
            warn!(uri = %parts.uri, "Request without bearer token");
            return Err(ApiError::Unauthenticated);
        };

        let claims = state.jwt.validate_token(token)?;
        Ok(AuthUser(claims.identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role, company: Option<&str>) -> Identity {
        Identity {
            user_id: "u-1".to_string(),
            company_id: company.map(str::to_string),
            role,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);
        let token = manager
            .generate_token(&identity(Role::Manager, Some("c-1")))
            .unwrap();

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.identity(), identity(Role::Manager, Some("c-1")));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("one", 3600)
            .generate_token(&identity(Role::Cashier, Some("c-1")))
            .unwrap();
        assert!(matches!(
            JwtManager::new("two", 3600).validate_token(&token),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret", -3600);
        let token = manager
            .generate_token(&identity(Role::Cashier, Some("c-1")))
            .unwrap();
        assert!(manager.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_unknown_role_and_blank_company() {
        let claims = Claims {
            sub: "u-9".to_string(),
            company_id: Some("  ".to_string()),
            role: "owner".to_string(),
            iat: 0,
            exp: 0,
        };
        let identity = claims.identity();
        assert_eq!(identity.role, Role::Staff);
        assert!(identity.company_id.is_none());
    }
}
