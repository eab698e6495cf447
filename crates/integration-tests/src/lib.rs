//! Integration tests for the Sealen client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sealen-integration-tests
//! ```
//!
//! No external services are needed: [`StubApi`] serves a small stand-in for
//! the Sealen REST API on an ephemeral local port, and the tests point the
//! real [`HttpApi`] at it.
//!
//! # Test Categories
//!
//! - `http_api` - Wire format, error mapping and request ids
//! - `session` - Session persistence and startup restore
//! - `flows` - Purchases, rentals and robot control end to end

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use sealen_client::api::HttpApi;
use sealen_client::api::http::REQUEST_ID_HEADER;
use sealen_client::{ClientConfig, ConfigError};

/// Password shared by every stub account.
pub const PASSWORD: &str = "Secret123";

/// Flat daily rate the stub server charges for rentals.
pub const DAILY_RATE: u64 = 1_500_000;

/// Seeded accounts: `(id, email, full name, role, certified)`.
pub const ACCOUNTS: [(i64, &str, &str, &str, bool); 4] = [
    (1, "admin@sealen.test", "Ayu Admin", "admin", true),
    (2, "operator@sealen.test", "Budi Operator", "operator", false),
    (3, "customer@sealen.test", "Sari Customer", "customer", false),
    (4, "certified@sealen.test", "Dewi Certified", "customer", true),
];

/// A request as the stub server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub request_id: Option<String>,
    pub bearer: Option<String>,
}

/// A canned failure returned for the next request, whatever it is.
#[derive(Debug, Clone)]
pub struct Failure {
    pub status: StatusCode,
    pub body: Value,
    pub retry_after: Option<u64>,
}

impl Failure {
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            retry_after: None,
        }
    }

    #[must_use]
    pub const fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[derive(Default)]
struct StubState {
    requests: Vec<RecordedRequest>,
    failure: Option<Failure>,
    access_tokens: HashMap<String, i64>,
    refresh_tokens: HashMap<String, i64>,
    bookings: Vec<Value>,
    booking_requests: Vec<Value>,
    robot_status: HashMap<i64, &'static str>,
    next_id: i64,
}

impl StubState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<Value> {
        let token = bearer(headers)?;
        let id = *self.access_tokens.get(&token)?;
        account(id)
    }
}

type Shared = Arc<Mutex<StubState>>;

fn lock(state: &Shared) -> MutexGuard<'_, StubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running stub server.
#[derive(Clone)]
pub struct StubApi {
    addr: SocketAddr,
    state: Shared,
}

impl StubApi {
    /// Start a stub server on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState {
            robot_status: HashMap::from([(1, "active"), (2, "offline"), (3, "maintenance")]),
            next_id: 100,
            ..StubState::default()
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub server");
        let addr = listener.local_addr().expect("Stub server has no address");

        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Base URL of the stub API, with a path prefix like the real one.
    ///
    /// # Panics
    ///
    /// Panics if the socket address does not form a URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("Invalid stub URL")
    }

    /// An HTTP client pointed at the stub.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn http_api(&self) -> HttpApi {
        HttpApi::new(self.base_url(), Duration::from_secs(5)).expect("Failed to build client")
    }

    /// Client configuration for the stub, persisting sessions at `session_file`.
    ///
    /// # Errors
    ///
    /// Returns the configuration error, which would be a bug in the stub.
    pub fn config(&self, session_file: &Path) -> Result<ClientConfig, ConfigError> {
        let base_url = self.base_url().to_string();
        let session_file = session_file.display().to_string();
        ClientConfig::from_lookup(move |key| match key {
            "SEALEN_API_URL" => Some(base_url.clone()),
            "SEALEN_SESSION_FILE" => Some(session_file.clone()),
            _ => None,
        })
    }

    /// Every request served so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Paths of every request served so far, prefixed with the method.
    #[must_use]
    pub fn request_log(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    /// Bodies of every `POST /bookings`.
    #[must_use]
    pub fn booking_requests(&self) -> Vec<Value> {
        lock(&self.state).booking_requests.clone()
    }

    /// Answer the next request with `failure`.
    pub fn fail_next(&self, failure: Failure) {
        lock(&self.state).failure = Some(failure);
    }

    /// Forget every access token, as a server restart would.
    pub fn revoke_tokens(&self) {
        lock(&self.state).access_tokens.clear();
    }

    /// Store a raw booking record, valid or not.
    pub fn insert_booking(&self, record: Value) {
        lock(&self.state).bookings.push(record);
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/products", get(products))
        .route("/api/products/{id}", get(product))
        .route("/api/robots/{id}", get(robot))
        .route("/api/robots/{id}/control/start", post(robot_start))
        .route("/api/bookings", get(bookings).post(create_booking))
        .route("/api/bookings/{id}/payment", post(create_payment))
        .route("/api/certification/progress", get(certification_progress))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

// =============================================================================
// Middleware
// =============================================================================

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        request_id: request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        bearer: bearer(request.headers()),
    };

    let failure = {
        let mut state = lock(&state);
        state.requests.push(recorded);
        state.failure.take()
    };

    match failure {
        Some(failure) => failure.into_response(),
        None => next.run(request).await,
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn account(id: i64) -> Option<Value> {
    ACCOUNTS
        .iter()
        .find(|(account_id, ..)| *account_id == id)
        .map(|(id, email, name, role, certified)| {
            json!({
                "user_id": id,
                "username": email.split('@').next().unwrap_or_default(),
                "email": email,
                "full_name": name,
                "role": role,
                "is_certified": certified,
                "created_at": "2025-01-15T08:00:00"
            })
        })
}

fn token_expired() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "msg": "Token has expired" })),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{what} not found") })),
    )
        .into_response()
}

fn product_record(id: i64) -> Option<Value> {
    let (name, price, stock) = match id {
        1 => ("Sealen CleanBot Mini", 45_000_000, 12),
        2 => ("Sealen CleanBot Pro", 125_000_000, 3),
        3 => ("Filter Replacement Kit", 750_000, 0),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": name,
        "category": if id == 3 { "accessory" } else { "robot" },
        "price": price,
        "is_available": true,
        "stock_quantity": stock
    }))
}

// =============================================================================
// Handlers
// =============================================================================

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let Some((id, ..)) = ACCOUNTS
        .iter()
        .find(|(_, account_email, ..)| *account_email == email)
        .filter(|_| password == PASSWORD)
    else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response();
    };

    let mut state = lock(&state);
    let n = state.next_id();
    let access = format!("access-{n}");
    let refresh = format!("refresh-{n}");
    state.access_tokens.insert(access.clone(), *id);
    state.refresh_tokens.insert(refresh.clone(), *id);

    Json(json!({
        "message": "Login successful",
        "access_token": access,
        "refresh_token": refresh,
        "user": account(*id)
    }))
    .into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match lock(&state).user_for(&headers) {
        Some(user) => Json(json!({ "user": user })).into_response(),
        None => token_expired(),
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer(&headers) {
        lock(&state).access_tokens.remove(&token);
    }
    Json(json!({ "message": "Logout successful" })).into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    let Some(user) = bearer(&headers).and_then(|t| state.refresh_tokens.get(&t).copied()) else {
        return token_expired();
    };
    let n = state.next_id();
    let access = format!("access-{n}");
    state.access_tokens.insert(access.clone(), user);
    Json(json!({ "access_token": access })).into_response()
}

async fn products() -> Response {
    let products: Vec<Value> = (1..=3).filter_map(product_record).collect();
    Json(json!({ "products": products })).into_response()
}

async fn product(UrlPath(id): UrlPath<i64>) -> Response {
    product_record(id).map_or_else(|| not_found("Product"), |p| Json(p).into_response())
}

async fn robot(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
) -> Response {
    let state = lock(&state);
    if state.user_for(&headers).is_none() {
        return token_expired();
    }
    let Some(status) = state.robot_status.get(&id) else {
        return not_found("Robot");
    };
    Json(json!({
        "robot_id": id,
        "robot_name": format!("CleanBot CB-00{id}"),
        "model": "CleanBot",
        "status": status,
        "battery_lvl": 64,
        "location": "Teluk Jakarta"
    }))
    .into_response()
}

async fn robot_start(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return token_expired();
    };
    if !matches!(user["role"].as_str(), Some("admin" | "operator")) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Access denied" })),
        )
            .into_response();
    }
    if state.robot_status.get(&id) == Some(&"active") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Robot is already active" })),
        )
            .into_response();
    }
    state.robot_status.insert(id, "active");
    Json(json!({ "message": "Robot started", "robot_id": id, "status": "active" }))
        .into_response()
}

async fn bookings(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return token_expired();
    };
    let mine: Vec<Value> = state
        .bookings
        .iter()
        .filter(|b| b["user_id"] == user["user_id"])
        .cloned()
        .collect();
    Json(json!({ "bookings": mine })).into_response()
}

async fn create_booking(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return token_expired();
    };
    state.booking_requests.push(body.clone());

    let total_cost = match body["booking_type"].as_str() {
        Some("rental") => DAILY_RATE * body["duration_days"].as_u64().unwrap_or_default(),
        _ => body["product_id"]
            .as_i64()
            .and_then(product_record)
            .and_then(|p| p["price"].as_u64())
            .unwrap_or_default(),
    };

    let id = state.next_id();
    let record = json!({
        "booking_id": id,
        "user_id": user["user_id"],
        "robot_id": body["robot_id"],
        "product_id": body["product_id"],
        "booking_type": body["booking_type"],
        "start_date": body["start_date"],
        "duration_days": body["duration_days"],
        "location": body["location"],
        "status": "pending",
        "total_cost": total_cost
    });
    state.bookings.push(record.clone());

    (
        StatusCode::CREATED,
        Json(json!({ "message": "Booking created", "booking": record })),
    )
        .into_response()
}

async fn create_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    if state.user_for(&headers).is_none() {
        return token_expired();
    }
    let Some(booking) = state
        .bookings
        .iter_mut()
        .find(|b| b["booking_id"].as_i64() == Some(id))
    else {
        return not_found("Booking");
    };
    booking["status"] = json!("confirmed");
    let amount = booking["total_cost"].clone();

    let payment_id = state.next_id();
    Json(json!({
        "payment": {
            "payment_id": payment_id,
            "booking_id": id,
            "amount": amount,
            "method": body["method"],
            "status": "completed",
            "transaction_id": format!("TXN-{payment_id}")
        }
    }))
    .into_response()
}

async fn certification_progress(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(user) = state.user_for(&headers) else {
        return token_expired();
    };
    let certified = user["is_certified"].as_bool().unwrap_or_default();
    Json(json!({
        "modules": [],
        "overall_progress": if certified { 100 } else { 25 },
        "completed_modules": if certified { 4 } else { 1 },
        "total_modules": 4,
        "is_certified": certified
    }))
    .into_response()
}
