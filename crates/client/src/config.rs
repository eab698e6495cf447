//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SEALEN_API_URL` - Base URL of the Sealen API (required for the `http` backend)
//!
//! ## Optional
//! - `SEALEN_BACKEND` - `http` (default) or `mock`
//! - `SEALEN_API_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `SEALEN_SESSION_FILE` - Where the session is persisted (default: .sealen/session.json)
//! - `SEALEN_RENTAL_RATE` - Rental rate per robot per day (default: 1500000)
//! - `SEALEN_CURRENCY` - Currency of the rental rate (default: IDR)
//! - `SEALEN_LOG_FORMAT` - `text` (default) or `json`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use sealen_core::pricing::{DEFAULT_DAILY_RATE_IDR, DailyRate};
use sealen_core::{CurrencyCode, Price};
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_SESSION_FILE: &str = ".sealen/session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which [`MarineApi`](crate::api::MarineApi) implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// The real API over HTTP.
    #[default]
    Http,
    /// In-memory simulation with seeded data.
    Mock,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown backend '{other}' (expected http or mock)")),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Mock => "mock",
        })
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Sealen client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Selected backend
    pub backend: Backend,
    /// API base URL, always ending in `/`. `None` only for the mock backend.
    pub api_url: Option<Url>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Session file location
    pub session_file: PathBuf,
    /// Rate used to quote rentals
    pub rental_rate: DailyRate,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
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

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = parse_env(&lookup, "SEALEN_BACKEND", "http")?;

        let api_url = match (backend, lookup("SEALEN_API_URL")) {
            (_, Some(raw)) => Some(parse_base_url(&raw)?),
            (Backend::Http, None) => {
                return Err(ConfigError::MissingEnvVar("SEALEN_API_URL".to_string()));
            }
            (Backend::Mock, None) => None,
        };

        let timeout_secs: u64 = parse_env(&lookup, "SEALEN_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SEALEN_API_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let session_file = PathBuf::from(get_env_or_default(
            &lookup,
            "SEALEN_SESSION_FILE",
            DEFAULT_SESSION_FILE,
        ));

        let currency: CurrencyCode = parse_env(&lookup, "SEALEN_CURRENCY", "IDR")?;
        let amount: Decimal = parse_env(
            &lookup,
            "SEALEN_RENTAL_RATE",
            &DEFAULT_DAILY_RATE_IDR.to_string(),
        )?;
        let rental_rate = DailyRate::new(Price::new(amount, currency)).map_err(|e| {
            ConfigError::InvalidEnvVar("SEALEN_RENTAL_RATE".to_string(), e.to_string())
        })?;

        let log_format = match get_env_or_default(&lookup, "SEALEN_LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "SEALEN_LOG_FORMAT".to_string(),
                    format!("expected text or json, got '{other}'"),
                ));
            }
        };

        Ok(Self {
            backend,
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            session_file,
            rental_rate,
            log_format,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Same configuration with a different backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` when switching to HTTP without a
    /// base URL.
    pub fn with_backend(mut self, backend: Backend) -> Result<Self, ConfigError> {
        if backend == Backend::Http && self.api_url.is_none() {
            return Err(ConfigError::MissingEnvVar("SEALEN_API_URL".to_string()));
        }
        self.backend = backend;
        Ok(self)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Get and parse an environment variable, falling back to `default`.
fn parse_env<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(lookup, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the API base URL. Relative joins need a trailing slash, so one is
/// added when missing.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("SEALEN_API_URL".to_string(), msg);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SEALEN_API_URL", "http://localhost:5000/api")]).unwrap();
        assert_eq!(config.backend, Backend::Http);
        assert_eq!(config.api_url.unwrap().as_str(), "http://localhost:5000/api/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.session_file, PathBuf::from(".sealen/session.json"));
        assert_eq!(config.rental_rate, DailyRate::standard());
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_http_backend_requires_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SEALEN_API_URL"));
    }

    #[test]
    fn test_mock_backend_needs_no_url() {
        let config = load(&[("SEALEN_BACKEND", "mock")]).unwrap();
        assert_eq!(config.backend, Backend::Mock);
        assert!(config.api_url.is_none());
        assert!(config.with_backend(Backend::Http).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = ("SEALEN_API_URL", "https://api.sealen.id/");
        assert!(load(&[base, ("SEALEN_RENTAL_RATE", "0")]).is_err());
        assert!(load(&[base, ("SEALEN_RENTAL_RATE", "-10")]).is_err());
        assert!(load(&[base, ("SEALEN_API_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[base, ("SEALEN_BACKEND", "grpc")]).is_err());
        assert!(load(&[base, ("SEALEN_LOG_FORMAT", "xml")]).is_err());
        assert!(load(&[("SEALEN_API_URL", "ftp://api.sealen.id")]).is_err());
        assert!(load(&[("SEALEN_API_URL", "not a url")]).is_err());
    }

    #[test]
    fn test_custom_rate_and_currency() {
        let config = load(&[
            ("SEALEN_BACKEND", "mock"),
            ("SEALEN_RENTAL_RATE", "120.50"),
            ("SEALEN_CURRENCY", "USD"),
        ])
        .unwrap();
        let rate = config.rental_rate.price();
        assert_eq!(rate.currency_code, CurrencyCode::USD);
        assert_eq!(rate.amount, Decimal::new(12050, 2));
    }

    #[test]
    fn test_empty_sentry_dsn_is_unset() {
        let config = load(&[("SEALEN_BACKEND", "mock"), ("SENTRY_DSN", "")]).unwrap();
        assert!(config.sentry_dsn.is_none());
    }
}
