//! Identity resolution for incoming connections.
//!
//! The transport layer hands each connection's bearer token to an
//! [`IdentityProvider`] and gets back a [`Username`] or a rejection.
//! Token issuance is out of scope for the room engine itself, but
//! [`JwtIdentityProvider::issue_token`] exists so deployments and tests
//! can mint tokens with the same key they validate with.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entities::Username;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
}

/// Claims carried by an access token.
#[derive(Debug, Deserialize, Serialize)]
pub struct AccessTokenClaims {
    /// Username the token was issued to.
    pub sub: String,
    /// Expiration, seconds since the epoch.
    pub exp: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
}

/// Maps a connection's credential to a stable identity.
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Username, AuthError>;
}

/// HS256 token validation with a shared secret.
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a token for `username` valid for `ttl_secs` seconds.
    pub fn issue_token(&self, username: &Username, ttl_secs: i64) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: username.as_str().to_string(),
            exp: now + ttl_secs,
            iat: now,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn resolve(&self, token: &str) -> Result<Username, AuthError> {
        let data = decode::<AccessTokenClaims>(
            token,
            &self.decoding_key,
            &Validation::default(),
        )
        .map_err(|err| match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;
        Ok(Username::new(&data.claims.sub))
    }
}
