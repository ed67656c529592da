//! Session-cookie authentication for dashboard connections
//!
//! The dashboard's OAuth callback signs a session token and sets it as a
//! cookie; the relay only ever verifies. Verification happens once, at
//! connect time. A live connection is never re-checked.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Result type for session verification
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while authenticating a connection
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no session cookie present")]
    MissingToken,

    #[error("session token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a dashboard session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Discord user ID of the session owner
    pub sub: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiry (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for a session lasting `ttl` from now.
    pub fn new(sub: impl Into<String>, ttl: chrono::Duration) -> Self {
        let now = chrono::Utc::now();
        Self {
            sub: sub.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Authenticated principal attached to a live connection.
///
/// `expires_at` reflects the token at connect time. It is not consulted
/// again afterward: a long-lived socket keeps receiving events past this
/// instant until it disconnects.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub expires_at: i64,
}

/// Session verification configuration
#[derive(Clone)]
pub struct SessionConfig {
    decoding_key: DecodingKey,
}

impl SessionConfig {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Load the session secret from SESSION_SECRET
    pub fn from_env() -> Self {
        let secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| {
            tracing::warn!(
                "SESSION_SECRET not set - dashboard session cookies will not verify against the OAuth issuer"
            );
            "insecure-dev-secret".to_string()
        });
        Self::new(secret.as_bytes())
    }

    /// Verify a raw token string and return the authenticated principal.
    ///
    /// Fails on a malformed token, a bad signature, or an expired session.
    pub fn verify(&self, token: &str) -> AuthResult<Principal> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(Principal {
            user_id: data.claims.sub,
            expires_at: data.claims.exp,
        })
    }
}

/// Extract a cookie value from a raw `Cookie` header.
///
/// Total over its input: an absent header or missing cookie yields `None`,
/// an empty value yields `Some("")` (and fails verification downstream).
/// With duplicate names the first match wins.
pub fn cookie_value<'a>(header: Option<&'a str>, name: &str) -> Option<&'a str> {
    let header = header?;
    for pair in header.split(';') {
        let Some((key, value)) = pair.trim().split_once('=') else {
            continue;
        };
        if key == name {
            return Some(value);
        }
    }
    None
}
