use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: impl Into<String>) -> Result<Self, AuthError> {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self::issued_at(user_id, email, role, Utc::now(), expiry_hours)
    }

    /// Claims issued at `now`, expiring `expiry_hours` later.
    pub fn issued_at(
        user_id: Uuid,
        email: impl Into<String>,
        role: impl Into<String>,
        now: DateTime<Utc>,
        expiry_hours: u64,
    ) -> Result<Self, AuthError> {
        let exp = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AuthError::TokenGeneration(format!("expiry of {} hours is out of range", expiry_hours)))?;

        Ok(Self {
            user_id,
            email: email.into(),
            role: role.into(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        })
    }
}

fn secret() -> Result<&'static str, AuthError> {
    let secret = config::config().security.jwt_secret.as_str();
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verifies signature and expiry and returns the claims.
pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, config::config().security.bcrypt_cost)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_identity() {
        let id = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(id, "dealer@example.com", "dealer").unwrap()).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.user_id, id);
        assert_eq!(claims.role, "dealer");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_tampered_and_expired_tokens() {
        let mut claims = Claims::new(Uuid::new_v4(), "a@example.com", "buyer").unwrap();
        let token = generate_jwt(&claims).unwrap();
        assert!(matches!(validate_jwt(&format!("{}x", token)), Err(AuthError::InvalidToken(_))));

        claims.exp = Utc::now().timestamp() - 3600;
        let expired = generate_jwt(&claims).unwrap();
        assert!(matches!(validate_jwt(&expired), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn oversized_expiry_is_an_error() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        for hours in [u64::MAX, i64::MAX as u64, 1 << 40] {
            let result = Claims::issued_at(id, "a@example.com", "buyer", now, hours);
            assert!(matches!(result, Err(AuthError::TokenGeneration(_))), "{} hours", hours);
        }
        let claims = Claims::issued_at(id, "a@example.com", "buyer", now, 24).unwrap();
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn password_hashes_verify() {
        let hash = bcrypt::hash("secret123", 4).unwrap();
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
        assert!(!verify_password("secret123", "not-a-hash"));
    }
}
