//! Sealen REST API over HTTP.
//!
//! JSON in, JSON out. Most responses wrap their payload in a single named
//! field (`{"robots": [...]}`, `{"booking": {...}}`); a few endpoints return
//! the object bare. Failures carry `{"error": "..."}`, except token failures
//! raised by the auth layer, which use `{"msg": "..."}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::field::Empty;
use tracing::{Span, instrument};
use url::Url;
use uuid::Uuid;

use sealen_core::{
    Booking, BookingId, BookingRequest, BookingStatus, Certificate, CertificationLevel,
    CertificationModule, CertificationProgress, ControlMode, DashboardOverview, ModuleId,
    ModuleProgressUpdate, Payment, PaymentMethod, Product, ProductId, Robot, RobotId,
    RobotTelemetry, User,
};

use super::{
    AccessToken, ApiError, AuthResponse, AuthTokens, ControlAck, Credentials, ManualCommand,
    MarineApi, RegistrationProfile,
};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Retry-After fallback when a 429 carries none.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP implementation of [`MarineApi`].
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    /// Always ends in `/` so relative joins keep the prefix.
    base_url: Url,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// Response envelopes

#[derive(Deserialize)]
struct AuthBody {
    #[serde(default)]
    message: Option<String>,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: User,
}

#[derive(Deserialize)]
struct RefreshBody {
    access_token: String,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct ProductsEnvelope {
    products: Vec<Product>,
}

#[derive(Deserialize)]
struct RobotsEnvelope {
    robots: Vec<Robot>,
}

#[derive(Deserialize)]
struct BookingsEnvelope {
    bookings: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct BookingEnvelope {
    booking: Booking,
}

#[derive(Deserialize)]
struct PaymentEnvelope {
    payment: Payment,
}

#[derive(Deserialize)]
struct ModulesEnvelope {
    modules: Vec<CertificationModule>,
}

#[derive(Deserialize)]
struct ProgressEnvelope {
    progress: ModuleProgressUpdate,
}

#[derive(Deserialize)]
struct CertificateEnvelope {
    certificate: Certificate,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl HttpApi {
    /// Create a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sealen-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpApiInner { client, base_url }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint path (no leading slash) against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Start a request with a fresh request id and optional bearer token.
    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());
        tracing::debug!(%method, %url, request_id = %request_id, "Sending API request");

        let builder = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id);

        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send and decode a JSON body.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send and discard the body.
    async fn execute_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    /// Map non-success statuses to [`ApiError`].
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .error
            .or(body.msg)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        tracing::debug!(status = status.as_u16(), %message, "API request refused");

        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            s if s.is_client_error() => ApiError::Rejected {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Server {
                status: s.as_u16(),
                message,
            },
        })
    }

    fn auth_response(body: AuthBody) -> AuthResponse {
        AuthResponse {
            tokens: AuthTokens {
                access: SecretString::from(body.access_token),
                refresh: body.refresh_token.map(SecretString::from),
            },
            user: body.user,
            message: body.message,
        }
    }
}

#[async_trait]
impl MarineApi for HttpApi {
    #[instrument(skip(self, credentials), fields(email = %credentials.email, request_id = Empty))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let body = json!({
            "email": credentials.email.as_str(),
            "password": credentials.password.expose_secret(),
        });
        let request = self
            .request(Method::POST, self.endpoint("auth/login")?, None)
            .json(&body);
        let auth: AuthBody = self.execute(request).await?;
        Ok(Self::auth_response(auth))
    }

    #[instrument(skip(self, profile), fields(email = %profile.email, role = %profile.role, request_id = Empty))]
    async fn register(&self, profile: &RegistrationProfile) -> Result<AuthResponse, ApiError> {
        let body = json!({
            "name": profile.name,
            "email": profile.email.as_str(),
            "password": profile.password.expose_secret(),
            "role": profile.role.as_str(),
        });
        let request = self
            .request(Method::POST, self.endpoint("auth/register")?, None)
            .json(&body);
        let auth: AuthBody = self.execute(request).await?;
        Ok(Self::auth_response(auth))
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError> {
        let request = self.request(Method::GET, self.endpoint("auth/me")?, Some(token));
        let envelope: UserEnvelope = self.execute(request).await?;
        Ok(envelope.user)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        let request = self.request(Method::POST, self.endpoint("auth/logout")?, Some(token));
        self.execute_unit(request).await
    }

    #[instrument(skip(self, refresh), fields(request_id = Empty))]
    async fn refresh_token(&self, refresh: &SecretString) -> Result<AccessToken, ApiError> {
        let request = self.request(Method::POST, self.endpoint("auth/refresh")?, Some(refresh));
        let body: RefreshBody = self.execute(request).await?;
        Ok(SecretString::from(body.access_token))
    }

    #[instrument(skip(self), fields(request_id = Empty))]
    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ApiError> {
        let mut url = self.endpoint("products")?;
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category);
        }
        let envelope: ProductsEnvelope = self.execute(self.request(Method::GET, url, None)).await?;
        Ok(envelope.products)
    }

    #[instrument(skip(self), fields(request_id = Empty))]
    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let url = self.endpoint(&format!("products/{id}"))?;
        self.execute(self.request(Method::GET, url, None)).await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robots(&self, token: &AccessToken, for_rental: bool) -> Result<Vec<Robot>, ApiError> {
        let mut url = self.endpoint("robots")?;
        if for_rental {
            url.query_pairs_mut().append_pair("for_rental", "true");
        }
        let envelope: RobotsEnvelope =
            self.execute(self.request(Method::GET, url, Some(token))).await?;
        Ok(envelope.robots)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robot(&self, token: &AccessToken, id: RobotId) -> Result<Robot, ApiError> {
        let url = self.endpoint(&format!("robots/{id}"))?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robot_status(
        &self,
        token: &AccessToken,
        id: RobotId,
    ) -> Result<RobotTelemetry, ApiError> {
        let url = self.endpoint(&format!("robots/{id}/status"))?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robot_start(&self, token: &AccessToken, id: RobotId) -> Result<ControlAck, ApiError> {
        let url = self.endpoint(&format!("robots/{id}/control/start"))?;
        self.execute(self.request(Method::POST, url, Some(token))).await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robot_stop(&self, token: &AccessToken, id: RobotId) -> Result<ControlAck, ApiError> {
        let url = self.endpoint(&format!("robots/{id}/control/stop"))?;
        self.execute(self.request(Method::POST, url, Some(token))).await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robot_manual(
        &self,
        token: &AccessToken,
        id: RobotId,
        command: ManualCommand,
    ) -> Result<ControlAck, ApiError> {
        let url = self.endpoint(&format!("robots/{id}/control/manual"))?;
        let body = json!({
            "action": "move",
            "direction": command.direction.as_str(),
            "speed": command.speed,
        });
        self.execute(self.request(Method::POST, url, Some(token)).json(&body))
            .await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn robot_mode(
        &self,
        token: &AccessToken,
        id: RobotId,
        mode: ControlMode,
    ) -> Result<ControlAck, ApiError> {
        let url = self.endpoint(&format!("robots/{id}/control/mode"))?;
        let body = json!({ "mode": mode.as_str() });
        self.execute(self.request(Method::PUT, url, Some(token)).json(&body))
            .await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn bookings(
        &self,
        token: &AccessToken,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ApiError> {
        let mut url = self.endpoint("bookings")?;
        if let Some(status) = status {
            url.query_pairs_mut().append_pair("status", status.as_str());
        }
        let envelope: BookingsEnvelope =
            self.execute(self.request(Method::GET, url, Some(token))).await?;

        // One malformed record should not hide the rest of the history.
        let bookings = envelope
            .bookings
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Booking>(raw) {
                Ok(booking) => Some(booking),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed booking record");
                    None
                }
            })
            .collect();
        Ok(bookings)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn booking(&self, token: &AccessToken, id: BookingId) -> Result<Booking, ApiError> {
        let url = self.endpoint(&format!("bookings/{id}"))?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    #[instrument(skip(self, token, request), fields(kind = %request.kind(), request_id = Empty))]
    async fn create_booking(
        &self,
        token: &AccessToken,
        request: &BookingRequest,
    ) -> Result<Booking, ApiError> {
        let url = self.endpoint("bookings")?;
        let envelope: BookingEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(request))
            .await?;
        Ok(envelope.booking)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn create_payment(
        &self,
        token: &AccessToken,
        booking: BookingId,
        method: PaymentMethod,
    ) -> Result<Payment, ApiError> {
        let url = self.endpoint(&format!("bookings/{booking}/payment"))?;
        let body = json!({ "method": method.as_str() });
        let envelope: PaymentEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(&body))
            .await?;
        Ok(envelope.payment)
    }

    #[instrument(skip(self), fields(request_id = Empty))]
    async fn certification_modules(&self) -> Result<Vec<CertificationModule>, ApiError> {
        let url = self.endpoint("certification/modules")?;
        let envelope: ModulesEnvelope = self.execute(self.request(Method::GET, url, None)).await?;
        Ok(envelope.modules)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn certification_progress(
        &self,
        token: &AccessToken,
    ) -> Result<CertificationProgress, ApiError> {
        let url = self.endpoint("certification/progress")?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn update_module_progress(
        &self,
        token: &AccessToken,
        module: ModuleId,
        progress: CertificationLevel,
        completed: bool,
    ) -> Result<ModuleProgressUpdate, ApiError> {
        let url = self.endpoint(&format!("certification/progress/{module}"))?;
        let body = json!({
            "progress_percentage": progress.percent(),
            "completed": completed,
        });
        let envelope: ProgressEnvelope = self
            .execute(self.request(Method::POST, url, Some(token)).json(&body))
            .await?;
        Ok(envelope.progress)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn complete_certification(&self, token: &AccessToken) -> Result<Certificate, ApiError> {
        let url = self.endpoint("certification/complete")?;
        let envelope: CertificateEnvelope =
            self.execute(self.request(Method::POST, url, Some(token))).await?;
        Ok(envelope.certificate)
    }

    #[instrument(skip(self, token), fields(request_id = Empty))]
    async fn dashboard_overview(
        &self,
        token: &AccessToken,
    ) -> Result<DashboardOverview, ApiError> {
        let url = self.endpoint("dashboard/overview")?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = api("http://localhost:5000/api");
        assert_eq!(api.base_url().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            api.endpoint("robots/3/control/start").unwrap().as_str(),
            "http://localhost:5000/api/robots/3/control/start"
        );
    }

    #[test]
    fn test_debug_shows_only_base_url() {
        let debug = format!("{:?}", api("https://api.sealen.id/v1/"));
        assert!(debug.contains("https://api.sealen.id/v1/"));
    }

    #[test]
    fn test_error_body_accepts_both_shapes() {
        let body: ErrorBody = serde_json::from_str(r#"{"error": "Invalid credentials"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("Invalid credentials"));

        let body: ErrorBody = serde_json::from_str(r#"{"msg": "Token has expired"}"#).unwrap();
        assert_eq!(body.msg.as_deref(), Some("Token has expired"));
    }
}
