//! Credential hashing and identity tokens.
//!
//! Two opaque primitives live here:
//!
//! - **Credential store**: argon2 password hashing and verification. Hashes
//!   are PHC strings carrying their own salt and parameters.
//! - **Token service**: HS256 JWTs with `sub` = user id and a 24-hour expiry,
//!   signed with the shared secret from configuration.
//!
//! # Example
//!
//! ```rust
//! use townsquare_server::auth::{hash_password, issue_token, verify_password, verify_token};
//!
//! let hash = hash_password("longpass1").unwrap();
//! assert!(verify_password("longpass1", &hash));
//! assert!(!verify_password("wrong", &hash));
//!
//! let token = issue_token("user-1", "secret").unwrap();
//! assert_eq!(verify_token(&token, "secret").unwrap(), "user-1");
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token lifetime in hours.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Errors from the credential and token primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token is malformed, has a bad signature, is expired, or carries
    /// no subject. One variant for all of them; callers must not be able to
    /// distinguish which check failed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Password hashing failed.
    #[error("failed to hash password")]
    Hash,

    /// Token signing failed.
    #[error("failed to issue token")]
    TokenCreation,
}

/// JWT claims: subject (user id), issued-at, expiry.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hash)
}

/// Verifies a password against a stored PHC hash string.
///
/// An unparseable hash verifies as `false` rather than erroring; callers
/// treat it identically to a wrong password.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Issues a signed token for `user_id`, expiring [`TOKEN_TTL_HOURS`] from now.
pub fn issue_token(user_id: &str, secret: &str) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    issue_token_with_times(user_id, secret, now, now + TOKEN_TTL_HOURS * 3600)
}

fn issue_token_with_times(
    user_id: &str,
    secret: &str,
    iat: i64,
    exp: i64,
) -> Result<String, AuthError> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat,
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::TokenCreation)
}

/// Verifies a token and returns its subject (the caller's user id).
///
/// Fails with [`AuthError::InvalidToken`] if the signature is wrong, the
/// token is expired, or the subject is missing.
pub fn verify_token(token: &str, secret: &str) -> Result<String, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    if data.claims.sub.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(data.claims.sub)
}
