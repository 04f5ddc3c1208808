//! Error types for the Townsquare server.
//!
//! This module defines the request-facing error taxonomy used throughout the
//! server, providing type-safe error handling with meaningful error messages.
//!
//! # Error Types
//!
//! - [`Error`] - Request-level errors, each variant mapping to one HTTP status
//! - [`StoreError`](crate::store::StoreError) - persistence failures, converted
//!   into [`Error`] at the workflow boundary
//!
//! # Example
//!
//! ```rust,ignore
//! use townsquare_server::error::Error;
//!
//! fn check_owner(owner_id: &str, caller_id: &str) -> Result<(), Error> {
//!     if owner_id != caller_id {
//!         return Err(Error::forbidden("you can only edit your own events"));
//!     }
//!     Ok(())
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::error;

use crate::store::StoreError;

/// Request-level error taxonomy.
///
/// Each variant carries a short human-readable message and maps to exactly
/// one HTTP status code:
///
/// | Variant | Status |
/// |---|---|
/// | `Validation` | 400 Bad Request |
/// | `Auth` | 401 Unauthorized |
/// | `Forbidden` | 403 Forbidden |
/// | `NotFound` | 404 Not Found |
/// | `Conflict` | 409 Conflict |
/// | `Store`, `Internal` | 500 Internal Server Error |
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or out-of-range input, rejected before any mutation.
    #[error("{0}")]
    Validation(String),

    /// A unique field (username, email) is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or an invalid/expired/missing token.
    ///
    /// The message is always generic; it never reveals which check failed.
    #[error("{0}")]
    Auth(String),

    /// A referenced event or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not authorized, e.g. a non-owner mutating an event.
    #[error("{0}")]
    Forbidden(String),

    /// Underlying persistence failure. Fatal for the request, never retried.
    #[error("document store failure: {0}")]
    Store(String),

    /// Unexpected internal failure outside the document store.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a new authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a new not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates a new forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The HTTP status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if this error indicates a client-side problem.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Internal(_))
    }

    /// Returns `true` if this error indicates a server-side problem.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Internal(_))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => Self::Conflict(format!("{field} already in use")),
            StoreError::Backend(message) => Self::Store(message),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures carry details the client must not see.
        let message = if self.is_server_error() {
            error!(error = %self, "request failed with server error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;
