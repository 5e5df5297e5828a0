use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;

/// Lifetime of a signed access token.
pub const ACCESS_TOKEN_TTL: Duration = Duration::minutes(15);
/// Lifetime of a stored refresh token.
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(30);

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("random source failure: {0}")]
    Random(#[from] rand::Error),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies access tokens and mints opaque refresh tokens.
///
/// Holds only the HMAC keys derived from the configured secret, so a clone is
/// cheap and verification never touches shared mutable state.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
        }
    }

    pub fn issue_access_token(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_access_token_at(user_id, OffsetDateTime::now_utc())
    }

    pub fn issue_access_token_at(
        &self,
        user_id: i64,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            iat: now.unix_timestamp(),
            exp: (now + ACCESS_TOKEN_TTL).unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)?;
        debug!(user_id, "access token signed");
        Ok(token)
    }

    /// 32 bytes from the OS CSPRNG, hex-encoded.
    pub fn issue_refresh_token(&self) -> Result<String, TokenError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(hex::encode(bytes))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_access_token_at(token, OffsetDateTime::now_utc())
    }

    /// Checks signature and claims, then expiry against `now` with no leeway.
    pub fn verify_access_token_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<i64, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.keys.decoding, &validation)
            .map_err(|_| TokenError::InvalidToken)?;

        if data.claims.exp < now.unix_timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn service() -> TokenService {
        TokenService::new(b"dev-secret")
    }

    #[test]
    fn issued_token_verifies_to_same_user() {
        let tokens = service();
        let token = tokens.issue_access_token(42).expect("sign access");
        assert_eq!(tokens.verify_access_token(&token).expect("verify"), 42);
    }

    #[test]
    fn token_expires_after_fifteen_minutes() {
        let tokens = service();
        let issued = OffsetDateTime::now_utc();
        let token = tokens.issue_access_token_at(7, issued).unwrap();

        let almost = issued + Duration::minutes(14);
        assert_eq!(tokens.verify_access_token_at(&token, almost).unwrap(), 7);

        let later = issued + Duration::minutes(16);
        assert!(matches!(
            tokens.verify_access_token_at(&token, later),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = TokenService::new(b"other-secret")
            .issue_access_token(1)
            .unwrap();
        assert!(matches!(
            service().verify_access_token(&token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        for token in ["", "abc", "a.b.c", "Bearer x"] {
            assert!(matches!(
                service().verify_access_token(token),
                Err(TokenError::InvalidToken)
            ));
        }
    }

    #[test]
    fn token_without_user_id_is_invalid() {
        #[derive(Serialize)]
        struct Partial {
            iat: i64,
            exp: i64,
        }
        let now = OffsetDateTime::now_utc();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                iat: now.unix_timestamp(),
                exp: (now + Duration::minutes(5)).unix_timestamp(),
            },
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(
            service().verify_access_token(&token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn refresh_tokens_are_64_hex_chars_and_unique() {
        let tokens = service();
        let a = tokens.issue_refresh_token().unwrap();
        let b = tokens.issue_refresh_token().unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
