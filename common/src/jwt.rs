use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
    misc::UserRole,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub role: UserRole,
    pub exp: usize,
}

impl JwtClaims {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Administrator
    }
}

pub struct ClaimsSpec {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// A signed token together with the instant it stops being valid.
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Raw bearer token of the current request, stored next to the claims so
/// that logout can revoke exactly the presented token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Generates JWT token based on user object and JWT configuration options
pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<IssuedToken> {
    let expires_at = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

    let claims = JwtClaims {
        user_id: spec.user_id,
        role: spec.role,
        exp: expires_at.timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(IssuedToken { token, expires_at })
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_from_header(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 360,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let user_id = Uuid::new_v4();
        let issued = generate_jwt(
            ClaimsSpec {
                user_id,
                role: UserRole::Consumer,
            },
            &config(),
        )
        .unwrap();

        let claims = validate_jwt(&issued.token, "test-secret").unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp as i64, issued.expires_at.timestamp());
        assert!(!claims.is_admin());

        let fifteen_days = Utc::now() + Duration::days(15);
        assert!((issued.expires_at - fifteen_days).num_seconds().abs() < 5);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = generate_jwt(
            ClaimsSpec {
                user_id: Uuid::new_v4(),
                role: UserRole::Administrator,
            },
            &config(),
        )
        .unwrap();
        assert!(validate_jwt(&issued.token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: -2,
        };
        let issued = generate_jwt(
            ClaimsSpec {
                user_id: Uuid::new_v4(),
                role: UserRole::Consumer,
            },
            &expired,
        )
        .unwrap();
        assert!(validate_jwt(&issued.token, "test-secret").is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_from_header("Bearer abc"), Some("abc"));
        assert_eq!(bearer_from_header("Bearer "), None);
        assert_eq!(bearer_from_header("Basic abc"), None);
    }
}
