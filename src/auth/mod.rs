pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::store::models::{Role, User};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub tenant_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Generate a signed session token for a user.
pub fn generate_token(user: &User) -> Result<String, ApiError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        tracing::error!("JWT_SECRET is not configured");
        return Err(ApiError::internal_server_error("Server misconfiguration"));
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &Claims::for_user(user), &encoding_key).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Failed to create session token")
    })
}

/// Validate a session token and extract its claims. Any failure (bad
/// signature, malformed, expired) collapses to a generic message.
pub fn validate_token(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new(
            "alice@example.com".into(),
            "Alice".into(),
            Role::Admin,
            Uuid::new_v4(),
        )
    }

    #[test]
    fn token_round_trip() {
        let user = test_user();
        let token = generate_token(&user).unwrap();
        let claims = validate_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.tenant_id, user.tenant_id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn tampered_token_rejected() {
        let token = generate_token(&test_user()).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(validate_token(&tampered).is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(validate_token("not-a-jwt").is_err());
    }
}
