//! Account registration and login workflows.
//!
//! Composes the credential store and token service (`auth`) with the
//! document repository (`store`).
//!
//! # Uniqueness
//!
//! Registration pre-checks both unique fields with a single `$or` query so
//! the response can name which one is taken. The check and the insert are
//! two separate operations; a concurrent registration can slip between them,
//! and the repository's write-time enforcement then rejects the insert with
//! a generic conflict instead.
//!
//! # Credential errors
//!
//! Login reports one uniform message whether the email is unknown or the
//! password fails, so responses cannot be used to enumerate accounts.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{self, AuthError};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, User, Viewer};

/// The one message every failed login gets.
const INVALID_CREDENTIALS: &str = "invalid email or password";

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Error::Auth(err.to_string()),
            AuthError::Hash | AuthError::TokenCreation => Error::Internal(err.to_string()),
        }
    }
}

/// Registers a new account and returns it with a fresh token.
pub async fn register(
    store: &dyn Store,
    jwt_secret: &str,
    request: &RegisterRequest,
) -> Result<AuthResponse> {
    request.validate()?;

    if let Some(existing) = store
        .find_user_by_username_or_email(&request.username, &request.email)
        .await?
    {
        if existing.email == request.email {
            return Err(Error::conflict("email already registered"));
        }
        return Err(Error::conflict("username already taken"));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: request.username.clone(),
        email: request.email.clone(),
        password_hash: auth::hash_password(&request.password)?,
        created_at: Utc::now(),
        last_login: None,
    };
    store.insert_user(&user).await?;

    let token = auth::issue_token(&user.id, jwt_secret)?;
    info!(user_id = %user.id, username = %user.username, "account registered");

    Ok(AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
    })
}

/// Verifies credentials and returns the account with a fresh token.
pub async fn login(
    store: &dyn Store,
    jwt_secret: &str,
    request: &LoginRequest,
) -> Result<AuthResponse> {
    request.validate()?;

    let Some(user) = store.find_user_by_email(&request.email).await? else {
        return Err(Error::auth(INVALID_CREDENTIALS));
    };
    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(Error::auth(INVALID_CREDENTIALS));
    }

    // Best-effort; a failed timestamp write must not fail the login.
    if let Err(err) = store.set_last_login(&user.id, Utc::now()).await {
        warn!(user_id = %user.id, error = %err, "failed to update last login");
    }

    let token = auth::issue_token(&user.id, jwt_secret)?;
    info!(user_id = %user.id, "login succeeded");

    Ok(AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
    })
}

/// Verifies a bearer token and yields the caller's user id.
pub fn authenticate(token: &str, jwt_secret: &str) -> Result<String> {
    Ok(auth::verify_token(token, jwt_secret)?)
}

/// Derives a viewer identity for optional-auth read endpoints.
///
/// A missing or unverifiable token yields [`Viewer::Anonymous`]; this path
/// never errors.
#[must_use]
pub fn viewer_from_token(token: Option<&str>, jwt_secret: &str) -> Viewer {
    match token {
        Some(token) => match auth::verify_token(token, jwt_secret) {
            Ok(user_id) => Viewer::Identified(user_id),
            Err(_) => Viewer::Anonymous,
        },
        None => Viewer::Anonymous,
    }
}
