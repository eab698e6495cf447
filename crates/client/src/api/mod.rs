//! Sealen REST API access.
//!
//! Everything the client needs from the backend goes through the
//! [`MarineApi`] capability trait. Two implementations exist and one is
//! chosen when the client is constructed:
//!
//! - [`HttpApi`] talks JSON over HTTP to the real service
//! - [`MockApi`] keeps a seeded fleet in memory for tests and offline demos
//!
//! Authenticated operations take the bearer token explicitly. The API layer
//! holds no session state of its own; that lives in
//! [`SessionGuard`](crate::session::SessionGuard).

pub mod http;
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use sealen_core::{
    Booking, BookingId, BookingRequest, BookingStatus, Certificate, CertificationLevel,
    CertificationModule, CertificationProgress, ControlMode, DashboardOverview, Direction, Email,
    ModuleId, ModuleProgressUpdate, Payment, PaymentMethod, Product, ProductId, Robot, RobotId,
    RobotStatus, RobotTelemetry, Role, User,
};

use crate::config::{Backend, ClientConfig, ConfigError};

pub use http::HttpApi;
pub use mock::MockApi;

/// Bearer token sent with authenticated requests.
pub type AccessToken = SecretString;

/// Errors that can occur when talking to the Sealen API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Token missing, expired or revoked (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API (HTTP 429).
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Request refused with a server-provided reason (other 4xx).
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Server failed (5xx).
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ApiError {
    /// Whether the error means the token is no longer accepted.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Message the server attached to a refused request, if any.
    ///
    /// Only client errors carry one; server failures and transport errors
    /// are never shown to the user verbatim.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Rejected { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

/// Data for a new account.
#[derive(Debug, Clone)]
pub struct RegistrationProfile {
    /// Display name.
    pub name: String,
    pub email: Email,
    pub password: SecretString,
    pub role: Role,
}

/// Tokens issued at login.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone)]
pub struct AuthTokens {
    pub access: AccessToken,
    /// Absent when the server did not issue one.
    pub refresh: Option<SecretString>,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access", &"[REDACTED]")
            .field("refresh", &self.refresh.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub tokens: AuthTokens,
    pub user: User,
    /// Greeting from the server, if any.
    pub message: Option<String>,
}

/// One manual drive command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualCommand {
    pub direction: Direction,
    /// Percent of full speed, 0..=100.
    pub speed: u8,
}

impl ManualCommand {
    /// Highest accepted speed.
    pub const MAX_SPEED: u8 = 100;

    /// Create a command, clamping `speed` to 0..=100.
    #[must_use]
    pub fn new(direction: Direction, speed: u32) -> Self {
        Self {
            direction,
            speed: u8::try_from(speed.min(u32::from(Self::MAX_SPEED))).unwrap_or(Self::MAX_SPEED),
        }
    }
}

/// Acknowledgement of a robot control command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlAck {
    pub message: String,
    #[serde(default)]
    pub robot_id: Option<RobotId>,
    /// New status after start/stop.
    #[serde(default)]
    pub status: Option<RobotStatus>,
    /// New mode after a mode switch.
    #[serde(default)]
    pub mode: Option<ControlMode>,
    /// Server-side id of a manual command.
    #[serde(default)]
    pub command_id: Option<String>,
}

/// Capabilities of the Sealen backend.
#[async_trait]
pub trait MarineApi: Send + Sync {
    // Authentication

    /// Exchange credentials for tokens and the user record.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    /// Create an account and log in.
    async fn register(&self, profile: &RegistrationProfile) -> Result<AuthResponse, ApiError>;

    /// "Who am I": the user the token belongs to.
    async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError>;

    /// Tell the server the session is over.
    async fn logout(&self, token: &AccessToken) -> Result<(), ApiError>;

    /// Trade a refresh token for a new access token.
    async fn refresh_token(&self, refresh: &SecretString) -> Result<AccessToken, ApiError>;

    // Catalogue

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ApiError>;

    async fn product(&self, id: ProductId) -> Result<Product, ApiError>;

    // Fleet

    /// Robots visible to the user; with `for_rental`, the unowned fleet
    /// offered for rent.
    async fn robots(&self, token: &AccessToken, for_rental: bool) -> Result<Vec<Robot>, ApiError>;

    async fn robot(&self, token: &AccessToken, id: RobotId) -> Result<Robot, ApiError>;

    async fn robot_status(
        &self,
        token: &AccessToken,
        id: RobotId,
    ) -> Result<RobotTelemetry, ApiError>;

    async fn robot_start(&self, token: &AccessToken, id: RobotId) -> Result<ControlAck, ApiError>;

    async fn robot_stop(&self, token: &AccessToken, id: RobotId) -> Result<ControlAck, ApiError>;

    async fn robot_manual(
        &self,
        token: &AccessToken,
        id: RobotId,
        command: ManualCommand,
    ) -> Result<ControlAck, ApiError>;

    async fn robot_mode(
        &self,
        token: &AccessToken,
        id: RobotId,
        mode: ControlMode,
    ) -> Result<ControlAck, ApiError>;

    // Bookings

    /// The user's bookings, newest first, optionally filtered by status.
    async fn bookings(
        &self,
        token: &AccessToken,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ApiError>;

    async fn booking(&self, token: &AccessToken, id: BookingId) -> Result<Booking, ApiError>;

    async fn create_booking(
        &self,
        token: &AccessToken,
        request: &BookingRequest,
    ) -> Result<Booking, ApiError>;

    async fn create_payment(
        &self,
        token: &AccessToken,
        booking: BookingId,
        method: PaymentMethod,
    ) -> Result<Payment, ApiError>;

    // Certification

    async fn certification_modules(&self) -> Result<Vec<CertificationModule>, ApiError>;

    async fn certification_progress(
        &self,
        token: &AccessToken,
    ) -> Result<CertificationProgress, ApiError>;

    async fn update_module_progress(
        &self,
        token: &AccessToken,
        module: ModuleId,
        progress: CertificationLevel,
        completed: bool,
    ) -> Result<ModuleProgressUpdate, ApiError>;

    async fn complete_certification(&self, token: &AccessToken) -> Result<Certificate, ApiError>;

    // Dashboard

    async fn dashboard_overview(&self, token: &AccessToken)
    -> Result<DashboardOverview, ApiError>;
}

/// Errors building an API client.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build the backend selected by `config`.
///
/// # Errors
///
/// Returns `ConnectError::Config` when the HTTP backend has no base URL and
/// `ConnectError::Http` when the HTTP client cannot be built.
pub fn connect(config: &ClientConfig) -> Result<Arc<dyn MarineApi>, ConnectError> {
    match config.backend {
        Backend::Http => {
            let base_url = config
                .api_url
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar("SEALEN_API_URL".to_string()))?;
            let api = HttpApi::new(base_url, config.timeout)?;
            tracing::info!(base_url = %api.base_url(), "Using Sealen HTTP API");
            Ok(Arc::new(api))
        }
        Backend::Mock => {
            tracing::warn!("Using simulated Sealen backend; no data leaves this process");
            Ok(Arc::new(MockApi::seeded()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("robot 9".to_string());
        assert_eq!(err.to_string(), "Not found: robot 9");

        let err = ApiError::Rejected {
            status: 400,
            message: "Robot is not active".to_string(),
        };
        assert_eq!(err.to_string(), "Rejected (400): Robot is not active");
    }

    #[test]
    fn test_server_message_only_for_client_errors() {
        let rejected = ApiError::Rejected {
            status: 400,
            message: "Email already registered".to_string(),
        };
        assert_eq!(rejected.server_message(), Some("Email already registered"));

        let server = ApiError::Server {
            status: 500,
            message: "psycopg2.OperationalError".to_string(),
        };
        assert_eq!(server.server_message(), None);
    }

    #[test]
    fn test_manual_command_clamps_speed() {
        assert_eq!(ManualCommand::new(Direction::Forward, 250).speed, 100);
        assert_eq!(ManualCommand::new(Direction::Left, 40).speed, 40);
        assert_eq!(ManualCommand::new(Direction::Right, 0).speed, 0);
    }

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = AuthTokens {
            access: SecretString::from("eyJhbGciOi.access".to_string()),
            refresh: Some(SecretString::from("eyJhbGciOi.refresh".to_string())),
        };
        let debug = format!("{tokens:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("eyJhbGciOi"));
    }

    #[test]
    fn test_connect_mock_without_url() {
        let config = ClientConfig::from_lookup(|key| {
            (key == "SEALEN_BACKEND").then(|| "mock".to_string())
        })
        .unwrap();
        assert!(connect(&config).is_ok());
    }
}
