use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Credential hashing and bearer-token issuing/validation. The rest of
/// the system treats both as opaque.
pub struct IdentityService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl IdentityService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    }

    /// An unparseable stored hash counts as a mismatch, not an error.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub fn issue_token(&self, user_id: Uuid) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthenticated("Invalid token subject".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let identity = IdentityService::new("test-secret");
        let hash = identity.hash_password("hunter22").unwrap();
        assert_ne!(hash, "hunter22");
        assert!(identity.verify_password("hunter22", &hash));
        assert!(!identity.verify_password("hunter23", &hash));
    }

    #[test]
    fn token_round_trip() {
        let identity = IdentityService::new("test-secret");
        let user_id = Uuid::new_v4();
        let token = identity.issue_token(user_id).unwrap();
        assert_eq!(identity.verify_token(&token).unwrap(), user_id);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let identity = IdentityService::new("test-secret");
        let other = IdentityService::new("other-secret");
        let token = other.issue_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            identity.verify_token(&token),
            Err(AppError::Unauthenticated(_))
        ));
    }
}
