//! Server configuration module.
//!
//! Parses configuration from environment variables for the Townsquare server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TOWNSQUARE_JWT_SECRET` | Yes | - | Shared secret for signing identity tokens |
//! | `TOWNSQUARE_MONGODB_URI` | No | `mongodb://localhost:27017` | MongoDB connection string |
//! | `TOWNSQUARE_DATABASE` | No | `townsquare` | Database name |
//! | `TOWNSQUARE_CORS_ORIGIN` | No | `*` | Comma-separated allowed origins |
//! | `TOWNSQUARE_MEMORY_STORE` | No | false | Use the volatile in-memory store (dev only) |
//! | `PORT` | No | 8080 | HTTP server port |

use std::env;

use thiserror::Error;
use tracing::warn;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8080;

/// Default MongoDB connection string.
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";

/// Default database name.
const DEFAULT_DATABASE: &str = "townsquare";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for signing and verifying identity tokens.
    pub jwt_secret: String,

    /// MongoDB connection string.
    pub mongodb_uri: String,

    /// Database name holding the users and events collections.
    pub database: String,

    /// Comma-separated allowed CORS origins, or `*` for any.
    pub cors_origin: String,

    /// When true, uses the volatile in-memory store (development only).
    pub memory_store: bool,

    /// HTTP server port.
    pub port: u16,
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `TOWNSQUARE_JWT_SECRET` is missing or empty,
    /// or if `PORT` is not a valid port number.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use townsquare_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("TOWNSQUARE_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                return Err(ConfigError::MissingEnvVar(
                    "TOWNSQUARE_JWT_SECRET".to_string(),
                ))
            }
        };

        let config = Self {
            jwt_secret,
            mongodb_uri: env::var("TOWNSQUARE_MONGODB_URI")
                .unwrap_or_else(|_| DEFAULT_MONGODB_URI.to_string()),
            database: env::var("TOWNSQUARE_DATABASE")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            cors_origin: env::var("TOWNSQUARE_CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            memory_store: parse_bool_env("TOWNSQUARE_MEMORY_STORE"),
            port: parse_port()?,
        };

        if config.memory_store {
            warn!(
                "TOWNSQUARE_MEMORY_STORE is enabled - data will not survive a restart. \
                 Do not use in production!"
            );
        }

        Ok(config)
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::set_var(key, value);
        }

        fn remove(&mut self, key: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn config_uses_defaults_when_only_secret_is_set() {
        let mut guard = EnvGuard::new();
        guard.set("TOWNSQUARE_JWT_SECRET", "secret");
        guard.remove("TOWNSQUARE_MONGODB_URI");
        guard.remove("TOWNSQUARE_DATABASE");
        guard.remove("TOWNSQUARE_CORS_ORIGIN");
        guard.remove("TOWNSQUARE_MEMORY_STORE");
        guard.remove("PORT");

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.jwt_secret, "secret");
        assert_eq!(config.mongodb_uri, DEFAULT_MONGODB_URI);
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.cors_origin, "*");
        assert!(!config.memory_store);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    #[serial]
    fn config_reads_all_overrides() {
        let mut guard = EnvGuard::new();
        guard.set("TOWNSQUARE_JWT_SECRET", "secret");
        guard.set("TOWNSQUARE_MONGODB_URI", "mongodb://db.internal:27017");
        guard.set("TOWNSQUARE_DATABASE", "townsquare-staging");
        guard.set("TOWNSQUARE_CORS_ORIGIN", "https://example.com");
        guard.set("TOWNSQUARE_MEMORY_STORE", "true");
        guard.set("PORT", "9090");

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.mongodb_uri, "mongodb://db.internal:27017");
        assert_eq!(config.database, "townsquare-staging");
        assert_eq!(config.cors_origin, "https://example.com");
        assert!(config.memory_store);
        assert_eq!(config.port, 9090);
    }

    #[test]
    #[serial]
    fn config_requires_jwt_secret() {
        let mut guard = EnvGuard::new();
        guard.remove("TOWNSQUARE_JWT_SECRET");

        let result = Config::from_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "TOWNSQUARE_JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn config_rejects_empty_jwt_secret() {
        let mut guard = EnvGuard::new();
        guard.set("TOWNSQUARE_JWT_SECRET", "");

        let result = Config::from_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_parse_bool_env_true() {
        let mut guard = EnvGuard::new();
        guard.set("TEST_BOOL", "true");
        assert!(parse_bool_env("TEST_BOOL"));

        guard.set("TEST_BOOL", "TRUE");
        assert!(parse_bool_env("TEST_BOOL"));
    }

    #[test]
    #[serial]
    fn test_parse_bool_env_false() {
        let mut guard = EnvGuard::new();
        guard.set("TEST_BOOL", "false");
        assert!(!parse_bool_env("TEST_BOOL"));

        guard.set("TEST_BOOL", "anything-else");
        assert!(!parse_bool_env("TEST_BOOL"));

        guard.remove("TEST_BOOL");
        assert!(!parse_bool_env("TEST_BOOL"));
    }

    #[test]
    #[serial]
    fn test_parse_port_default() {
        let mut guard = EnvGuard::new();
        guard.remove("PORT");

        let port = parse_port().expect("should parse port");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    #[serial]
    fn test_parse_port_custom() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "3000");

        let port = parse_port().expect("should parse port");
        assert_eq!(port, 3000);
    }

    #[test]
    #[serial]
    fn test_parse_port_invalid() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "not-a-number");

        let result = parse_port();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidPort(_)));
    }

    #[test]
    #[serial]
    fn test_parse_port_out_of_range() {
        let mut guard = EnvGuard::new();
        guard.set("PORT", "99999");

        let result = parse_port();
        assert!(result.is_err());
    }
}
