//! JWT authentication.
//!
//! Tokens are issued by the external identity provider and signed with a
//! shared HS256 secret. Verification turns the claims into the [`Actor`]
//! that every handler receives as a request extension.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_core::{Actor, Role};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (actor id)
    pub sub: String,

    /// Display name
    pub name: String,

    /// Tenant ID
    pub tenant_id: String,

    /// "admin" or "employee"
    pub role: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Verifies (and for development, issues) identity tokens.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `actor`. Used by development tooling and tests.
    pub fn issue(&self, actor: &Actor, lifetime_secs: i64) -> ApiResult<String> {
        let claims = Claims {
            sub: actor.actor_id.clone(),
            name: actor.display_name.clone(),
            tenant_id: actor.tenant_id.clone(),
            role: actor.role.to_string(),
            exp: (Utc::now() + Duration::seconds(lifetime_secs)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Storage(format!("Failed to sign token: {}", e)))
    }

    /// Validates a token and returns the actor it identifies.
    pub fn verify(&self, token: &str) -> ApiResult<Actor> {
        let validation = Validation::new(Algorithm::HS256);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if claims.sub.trim().is_empty() || claims.tenant_id.trim().is_empty() {
            return Err(ApiError::Unauthorized(
                "Token is missing subject or tenant".to_string(),
            ));
        }

        let role: Role = claims
            .role
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("Unknown role: {}", claims.role)))?;

        Ok(Actor::new(claims.sub, claims.name, claims.tenant_id, role))
    }
}

/// Extract bearer token from the authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Rejects requests without a valid bearer token and attaches the [`Actor`].
pub async fn require_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let actor = state.jwt.verify(token)?;
    debug!(actor = %actor.actor_id, tenant = %actor.tenant_id, "Authenticated request");

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn cashier() -> Actor {
        Actor::new("user-1", "Rita", "tenant-1", Role::Employee)
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret");

        let token = manager.issue(&cashier(), 3600).unwrap();
        let actor = manager.verify(&token).unwrap();

        assert_eq!(actor, cashier());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("secret-a").issue(&cashier(), 3600).unwrap();
        let result = JwtManager::new("secret-b").verify(&token);
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret");
        // Past the default 60s leeway.
        let token = manager.issue(&cashier(), -600).unwrap();
        assert!(manager.verify(&token).is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let claims = Claims {
            sub: "user-1".into(),
            name: "Rita".into(),
            tenant_id: "tenant-1".into(),
            role: "superuser".into(),
            exp: (Utc::now() + Duration::seconds(600)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(JwtManager::new("test-secret").verify(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));
    }
}
