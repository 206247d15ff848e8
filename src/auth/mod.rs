use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::types::PrincipalKind;

pub mod password;
pub mod principal;

pub use principal::Principal;
pub use password::{hash_password, validate_member_password, validate_user_password, verify_password};

/// JWT claims shared by parent and member tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username within the credential domain named by `kind`
    pub sub: String,
    /// Credential domain; tokens without it are parent tokens
    #[serde(rename = "type", default)]
    pub kind: PrincipalKind,
    pub id: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Issues and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    expiry_hours: u64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.jwt_secret.clone(), security.jwt_expiry_hours)
    }

    pub fn claims(
        &self,
        kind: PrincipalKind,
        subject: &str,
        id: i32,
        name: &str,
        household_id: Option<i32>,
    ) -> Claims {
        let now = Utc::now();
        Claims {
            sub: subject.to_string(),
            kind,
            id,
            name: name.to_string(),
            household_id,
            exp: (now + Duration::hours(self.expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?;
    let scheme = value.get(..7)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = value[7..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", 3)
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let claims = tokens.claims(PrincipalKind::Member, "kid1", 4, "Kid One", Some(1));
        let token = tokens.issue(&claims).unwrap();

        let decoded = tokens.verify(&token).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 3 * 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = service().claims(PrincipalKind::User, "parent", 1, "Parent", None);
        let token = TokenService::new("bad-secret", 3).issue(&claims).unwrap();
        assert!(matches!(service().verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let mut claims = tokens.claims(PrincipalKind::User, "parent", 1, "Parent", None);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = tokens.issue(&claims).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn missing_type_means_parent() {
        let json = serde_json::json!({
            "sub": "parent", "id": 1, "name": "Parent", "exp": 1, "iat": 0
        });
        let claims: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.kind, PrincipalKind::User);
        assert_eq!(claims.household_id, None);
    }

    #[test]
    fn empty_secret_cannot_issue() {
        let tokens = TokenService::new("", 3);
        let claims = tokens.claims(PrincipalKind::User, "parent", 1, "Parent", None);
        assert!(matches!(tokens.issue(&claims), Err(AuthError::InvalidSecret)));
    }

    #[test]
    fn bearer_prefix_is_case_insensitive() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }
}
