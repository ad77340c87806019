//! HS256 access tokens.

use std::fmt;

use chrono::{Duration, Utc};
use erx_persistence::types::RecordId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Issued at (seconds since the epoch).
    pub iat: i64,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
}

/// Errors raised while issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is malformed, badly signed or expired.
    #[error("invalid or expired token")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// The subject claim is not a record id.
    #[error("token subject is not a valid id")]
    BadSubject,
}

/// Issues and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a token service signing with `secret`.
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    /// Issues a token for `user`.
    pub fn issue(&self, user: &RecordId) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies a token and returns the user id it was issued for.
    pub fn verify(&self, token: &str) -> Result<RecordId, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        RecordId::parse(&data.claims.sub).ok_or(TokenError::BadSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erx_persistence::types::IdGenerator;

    #[test]
    fn test_issue_then_verify() {
        let tokens = TokenService::new("secret", 1);
        let user = IdGenerator::new().next_id();
        let token = tokens.issue(&user).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), user);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let user = IdGenerator::new().next_id();
        let token = TokenService::new("one", 1).issue(&user).unwrap();
        assert!(matches!(
            TokenService::new("two", 1).verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new("secret", -2);
        let user = IdGenerator::new().next_id();
        let token = tokens.issue(&user).unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = TokenService::new("secret", 1);
        assert!(tokens.verify("not.a.token").is_err());
    }
}
