//! JWT session tokens
//!
//! Tokens are HS256-signed with the configured secret and carry the user
//! id, email, and a seven-day expiry. The same keys verify both REST
//! bearer headers and the realtime handshake credential.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token lifetime.
const TOKEN_TTL_DAYS: i64 = 7;

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl std::fmt::Debug for Keys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Keys(..)")
    }
}

/// Mint a token for the given user.
pub fn create_token(
    keys: &Keys,
    user_id: Uuid,
    email: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };

    encode(&Header::default(), &claims, &keys.encoding)
}

/// Verify a token and return its claims. Expired or tampered tokens fail.
pub fn verify_token(keys: &Keys, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(token, &keys.decoding, &Validation::default())?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keys() -> Keys {
        Keys::new("test-secret")
    }

    #[test]
    fn token_round_trip() {
        let keys = test_keys();
        let user_id = Uuid::new_v4();

        let token = create_token(&keys, user_id, "a@example.com").unwrap();
        let claims = verify_token(&keys, &token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = test_keys();
        let token = create_token(&keys, Uuid::new_v4(), "a@example.com").unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(verify_token(&keys, &tampered).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = test_keys();
        let other = Keys::new("other-secret");

        let token = create_token(&other, Uuid::new_v4(), "a@example.com").unwrap();
        assert!(verify_token(&keys, &token).is_err());
    }
}
