//! Self-contained signed session tokens.
//!
//! The token carries the whole user record, so "who am I" is a signature and
//! expiry check with no network round-trip. Used for development logins and
//! offline demos; the restore sequence treats it like any other identity
//! service.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IdentityError, IdentityService};
use crate::session::User;

/// Token lifetime: 2 weeks.
pub const TOKEN_DURATION_SECS: u64 = 14 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Account creation timestamp, copied from the user record
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl TokenClaims {
    fn into_user(self) -> User {
        User {
            id: self.sub,
            email: self.email,
            role: self.role,
            created_at: self.created_at,
            full_name: self.full_name,
            phone: None,
            avatar_url: None,
            address: None,
        }
    }
}

#[derive(Clone)]
pub struct TokenIdentityService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIdentityService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a token for `user`, valid for [`TOKEN_DURATION_SECS`].
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = unix_now()?;
        let claims = TokenClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            created_at: user.created_at.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: now + TOKEN_DURATION_SECS,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Check signature and expiry (no leeway).
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Decoding)
    }
}

impl IdentityService for TokenIdentityService {
    async fn current_user(&self, credential: &str) -> Result<User, IdentityError> {
        self.validate(credential)
            .map(TokenClaims::into_user)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                IdentityError::Unauthorized
            })
    }
}

pub(crate) fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::TimeError)
}

#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding or validating the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    fn seller() -> User {
        let mut user = User::new("u-9", "toko@example.com", Role::Seller, "1700000000");
        user.full_name = Some("Toko Maju".to_string());
        user
    }

    #[test]
    fn test_issue_and_validate() {
        let service = TokenIdentityService::new(b"test-secret-key-for-testing");

        let token = service.issue(&seller()).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.sub, "u-9");
        assert_eq!(claims.role, "seller");
        assert_eq!(claims.exp - claims.iat, TOKEN_DURATION_SECS);
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = TokenIdentityService::new(b"secret-1");
        let verifier = TokenIdentityService::new(b"secret-2");

        let token = issuer.issue(&seller()).unwrap();
        assert!(verifier.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let secret = b"test-secret";
        let now = unix_now().unwrap();
        let claims = TokenClaims {
            sub: "u-9".to_string(),
            email: "toko@example.com".to_string(),
            role: "seller".to_string(),
            created_at: "1700000000".to_string(),
            full_name: None,
            iat: now - 100,
            exp: now - 50,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let service = TokenIdentityService::new(secret);
        assert!(service.validate(&token).is_err());
    }

    #[tokio::test]
    async fn test_current_user_rebuilds_profile() {
        let service = TokenIdentityService::new(b"test-secret-key-for-testing");
        let token = service.issue(&seller()).unwrap();

        let user = service.current_user(&token).await.unwrap();
        assert_eq!(user, seller());

        assert!(matches!(
            service.current_user("garbage").await,
            Err(IdentityError::Unauthorized)
        ));
    }
}
