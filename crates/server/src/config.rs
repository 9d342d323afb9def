//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `SERVER_HOST` - Bind address (default: 127.0.0.1)
//! - `SERVER_PORT` - Listen port (default: 3000)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `ORDER_STATEMENT_TIMEOUT_MS` - Per-statement timeout in order transactions (default: 30000)
//! - `ORDER_RETRY_MAX_ATTEMPTS` - Attempts per order, first one included (default: 3)
//! - `ORDER_RETRY_BASE_DELAY_MS` - Backoff base (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `LOG_FORMAT` - `text` (default) or `json`

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::services::{OrderSettings, RetryPolicy};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

/// Server application configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
    /// Per-statement timeout inside order transactions
    pub statement_timeout: Duration,
    /// Attempts per order, first one included
    pub retry_max_attempts: u32,
    /// Backoff base between attempts
    pub retry_base_delay: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("statement_timeout", &self.statement_timeout)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let database_url = SecretString::from(env.required("DATABASE_URL")?);
        let host = env.parsed_or("SERVER_HOST", "127.0.0.1")?;
        let port = env.parsed_or("SERVER_PORT", "3000")?;
        let max_connections = env.positive_or("DATABASE_MAX_CONNECTIONS", "10")?;
        let statement_timeout =
            Duration::from_millis(env.positive_or("ORDER_STATEMENT_TIMEOUT_MS", "30000")?);
        let retry_max_attempts = env.positive_or("ORDER_RETRY_MAX_ATTEMPTS", "3")?;
        let retry_base_delay =
            Duration::from_millis(env.parsed_or("ORDER_RETRY_BASE_DELAY_MS", "100")?);
        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let log_format = env.parsed_or("LOG_FORMAT", "text")?;

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
            statement_timeout,
            retry_max_attempts,
            retry_base_delay,
            sentry_dsn,
            sentry_environment,
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Order transaction settings derived from this configuration.
    #[must_use]
    pub const fn order_settings(&self) -> OrderSettings {
        OrderSettings {
            statement_timeout: self.statement_timeout,
            retry: RetryPolicy::new(self.retry_max_attempts, self.retry_base_delay),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Like [`Self::parsed_or`], rejecting zero.
    fn positive_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr + Default + PartialEq,
        T::Err: std::fmt::Display,
    {
        let value: T = self.parsed_or(key, default)?;
        if value == T::default() {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/oven")]).unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://localhost/oven");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.statement_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.sentry_dsn.is_none());

        let settings = config.order_settings();
        assert_eq!(settings.retry.max_attempts(), 3);
        assert_eq!(settings.retry.delay_after(1), Duration::from_millis(200));
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/oven"),
            ("SERVER_HOST", "0.0.0.0"),
            ("SERVER_PORT", "8080"),
            ("ORDER_STATEMENT_TIMEOUT_MS", "5000"),
            ("ORDER_RETRY_MAX_ATTEMPTS", "5"),
            ("ORDER_RETRY_BASE_DELAY_MS", "0"),
            ("LOG_FORMAT", "JSON"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.statement_timeout, Duration::from_secs(5));
        assert_eq!(config.order_settings().retry.max_attempts(), 5);
        assert_eq!(config.retry_base_delay, Duration::ZERO);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/oven"),
            ("ORDER_RETRY_MAX_ATTEMPTS", "0"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ORDER_RETRY_MAX_ATTEMPTS")
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/oven"),
            ("ORDER_STATEMENT_TIMEOUT_MS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("DATABASE_URL", "postgres://db/oven"), ("SERVER_PORT", "http")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "SERVER_PORT"));
    }

    #[test]
    fn test_invalid_log_format() {
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[
            ("DATABASE_URL", "postgres://user:hunter2@db/oven"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
        ])
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("sentry.example"));
        assert!(debug.contains("[REDACTED]"));
    }
}
