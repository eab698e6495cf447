//! In-memory simulation of the Sealen API.
//!
//! Seeded with a small fleet, catalogue, course and one account per role.
//! It follows the server's rules closely enough to drive every client flow
//! offline: tokens are checked, control commands need an operator, the
//! dashboard needs an admin, bookings are scoped to their owner and payments
//! confirm bookings.
//!
//! Every call is appended to a log, and individual operations can be made to
//! fail, so tests can assert both what was called and how failures are
//! handled.
//!
//! | Email                 | Password       | Role     | Certified |
//! |-----------------------|----------------|----------|-----------|
//! | `admin@sealen.id`     | `Admin123`     | admin    | yes       |
//! | `operator@sealen.id`  | `Operator123`  | operator | no        |
//! | `customer@sealen.id`  | `Customer123`  | customer | no        |
//! | `certified@sealen.id` | `Certified123` | customer | yes       |

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

use sealen_core::access;
use sealen_core::pricing::{DEFAULT_DAILY_RATE_IDR, compute_rental_price};
use sealen_core::{
    ActivityEntry, Booking, BookingId, BookingRequest, BookingStatus, BookingTarget, Certificate,
    CertificateId, CertificationLevel, CertificationModule, CertificationProgress, ControlMode,
    DashboardOverview, Email, ModuleId, ModuleProgress, ModuleProgressUpdate, Payment, PaymentId,
    PaymentMethod, PaymentStatus, Position, Product, ProductId, Robot, RobotId, RobotStatus,
    RobotTelemetry, Role, SensorReadings, User, UserId,
};

use super::{
    AccessToken, ApiError, AuthResponse, AuthTokens, ControlAck, Credentials, ManualCommand,
    MarineApi, RegistrationProfile,
};

/// In-memory [`MarineApi`].
#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<Account>,
    products: Vec<Product>,
    robots: Vec<Robot>,
    modules: Vec<CertificationModule>,
    bookings: Vec<Booking>,
    /// (user, module) → percent
    progress: HashMap<(UserId, ModuleId), CertificationLevel>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    failing: HashSet<&'static str>,
    calls: Vec<&'static str>,
    sequence: i64,
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// Log the call and apply any injected failure.
    fn enter(&mut self, operation: &'static str) -> Result<(), ApiError> {
        self.calls.push(operation);
        if self.failing.contains(operation) {
            return Err(ApiError::Server {
                status: 503,
                message: format!("simulated outage in {operation}"),
            });
        }
        Ok(())
    }

    fn user_for(&self, token: &AccessToken) -> Result<User, ApiError> {
        let id = self
            .access_tokens
            .get(token.expose_secret())
            .ok_or_else(|| ApiError::Unauthorized("Token has expired".to_string()))?;
        self.accounts
            .iter()
            .find(|a| a.user.id == *id)
            .map(|a| a.user.clone())
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    fn operator_for(&self, token: &AccessToken) -> Result<User, ApiError> {
        let user = self.user_for(token)?;
        if access::can_access_control_panel(Some(&user)) {
            Ok(user)
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    fn admin_for(&self, token: &AccessToken) -> Result<User, ApiError> {
        let user = self.user_for(token)?;
        if access::can_access_dashboard(Some(&user)) {
            Ok(user)
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    fn issue_tokens(&mut self, user: UserId) -> AuthTokens {
        let n = self.next_id();
        let access = format!("mock-access-{user}-{n}");
        let refresh = format!("mock-refresh-{user}-{n}");
        self.access_tokens.insert(access.clone(), user);
        self.refresh_tokens.insert(refresh.clone(), user);
        AuthTokens {
            access: SecretString::from(access),
            refresh: Some(SecretString::from(refresh)),
        }
    }

    fn robot_mut(&mut self, id: RobotId) -> Result<&mut Robot, ApiError> {
        self.robots
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Robot {id} not found")))
    }

    fn progress_for(&self, user: &User) -> CertificationProgress {
        let mut modules: Vec<ModuleProgress> = self
            .modules
            .iter()
            .map(|module| {
                let level = self
                    .progress
                    .get(&(user.id, module.id))
                    .copied()
                    .unwrap_or_default();
                ModuleProgress {
                    module: module.clone(),
                    completed: level.is_complete(),
                    progress_percentage: level,
                }
            })
            .collect();
        modules.sort_by_key(|m| m.module.order_index);

        let total_modules = u32::try_from(modules.len()).unwrap_or(u32::MAX);
        let completed_modules =
            u32::try_from(modules.iter().filter(|m| m.completed).count()).unwrap_or(u32::MAX);
        let sum: i64 = modules
            .iter()
            .map(|m| i64::from(m.progress_percentage.percent()))
            .sum();
        let overall = if total_modules == 0 {
            CertificationLevel::NONE
        } else {
            CertificationLevel::new(sum / i64::from(total_modules))
        };

        CertificationProgress {
            modules,
            overall_progress: overall,
            completed_modules,
            total_modules,
            is_certified: overall.is_complete(),
        }
    }
}

impl MockApi {
    /// Empty backend with no accounts, fleet or catalogue.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backend seeded with demo accounts, robots, products and the course.
    #[must_use]
    pub fn seeded() -> Self {
        let account = |id: i64, email: &str, name: &str, role: Role, certified: bool, pw: &str| {
            Email::parse(email).ok().map(|email| Account {
                user: User {
                    id: UserId::new(id),
                    username: email.as_str().to_string(),
                    email,
                    full_name: name.to_string(),
                    role,
                    is_certified: certified,
                    created_at: None,
                },
                password: pw.to_string(),
            })
        };

        let accounts = [
            account(1, "admin@sealen.id", "Sealen Admin", Role::Admin, true, "Admin123"),
            account(2, "operator@sealen.id", "Budi Operator", Role::Operator, false, "Operator123"),
            account(3, "customer@sealen.id", "Sari Customer", Role::Customer, false, "Customer123"),
            account(4, "certified@sealen.id", "Dewi Certified", Role::Customer, true, "Certified123"),
        ]
        .into_iter()
        .flatten()
        .collect();

        let product = |id: i64, name: &str, category: &str, price: i64, stock: u32| Product {
            id: ProductId::new(id),
            name: name.to_string(),
            category: category.to_string(),
            price: Decimal::from(price),
            description: None,
            image_url: None,
            features: Vec::new(),
            is_available: true,
            stock_quantity: stock,
        };

        let robot = |id: i64, name: &str, status: RobotStatus, battery: u8| Robot {
            id: RobotId::new(id),
            name: name.to_string(),
            model: Some("CleanBot".to_string()),
            model_type: Some("surface".to_string()),
            status,
            battery,
            location: Some("Teluk Jakarta".to_string()),
            current_position: Some(Position {
                latitude: Some(-6.1),
                longitude: Some(106.8),
                depth: Some(0.0),
            }),
            firmware_version: Some("2.4.1".to_string()),
            owner_id: None,
        };

        let module = |id: i64, title: &str, minutes: u32| CertificationModule {
            id: ModuleId::new(id),
            module_number: u32::try_from(id).unwrap_or_default(),
            title: title.to_string(),
            duration_minutes: Some(minutes),
            description: None,
            order_index: u32::try_from(id).unwrap_or_default(),
        };

        let state = MockState {
            accounts,
            products: vec![
                product(1, "Sealen CleanBot Mini", "robot", 45_000_000, 12),
                product(2, "Sealen CleanBot Pro", "robot", 125_000_000, 3),
                product(3, "Filter Replacement Kit", "accessory", 750_000, 0),
            ],
            robots: vec![
                robot(1, "CleanBot CB-001", RobotStatus::Active, 87),
                robot(2, "CleanBot CB-002", RobotStatus::Offline, 64),
                robot(3, "CleanBot CB-003", RobotStatus::Maintenance, 12),
                robot(4, "CleanBot CB-004", RobotStatus::Charging, 35),
            ],
            modules: vec![
                module(1, "Pengenalan Robot Sealen", 30),
                module(2, "Navigasi dan Kontrol", 45),
                module(3, "Perawatan Rutin", 40),
                module(4, "Keselamatan Operasional", 35),
            ],
            sequence: 100,
            ..MockState::default()
        };

        Self {
            state: Mutex::new(state),
        }
    }

    /// Make `operation` fail with a simulated 503 until cleared.
    pub async fn fail(&self, operation: &'static str) {
        self.state.lock().await.failing.insert(operation);
    }

    /// Stop failing `operation`.
    pub async fn recover(&self, operation: &'static str) {
        self.state.lock().await.failing.remove(operation);
    }

    /// Operations called so far, in order.
    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.lock().await.calls.clone()
    }

    /// Invalidate every issued access token.
    pub async fn expire_tokens(&self) {
        self.state.lock().await.access_tokens.clear();
    }
}

#[async_trait]
impl MarineApi for MockApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("login")?;

        let account = state
            .accounts
            .iter()
            .find(|a| {
                a.user.email == credentials.email
                    && a.password == credentials.password.expose_secret()
            })
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

        let tokens = state.issue_tokens(account.user.id);
        Ok(AuthResponse {
            tokens,
            user: account.user,
            message: Some("Login successful".to_string()),
        })
    }

    async fn register(&self, profile: &RegistrationProfile) -> Result<AuthResponse, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("register")?;

        if state.accounts.iter().any(|a| a.user.email == profile.email) {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Email already registered".to_string(),
            });
        }

        let id = UserId::new(state.next_id());
        let user = User {
            id,
            username: profile.email.as_str().to_string(),
            email: profile.email.clone(),
            full_name: profile.name.clone(),
            role: profile.role,
            is_certified: false,
            created_at: Some(Utc::now()),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: profile.password.expose_secret().to_string(),
        });

        let tokens = state.issue_tokens(id);
        Ok(AuthResponse {
            tokens,
            user,
            message: Some("User registered successfully".to_string()),
        })
    }

    async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("current_user")?;
        state.user_for(token)
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        state.enter("logout")?;
        state.user_for(token)?;
        state.access_tokens.remove(token.expose_secret());
        Ok(())
    }

    async fn refresh_token(&self, refresh: &SecretString) -> Result<AccessToken, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("refresh_token")?;

        let user = *state
            .refresh_tokens
            .get(refresh.expose_secret())
            .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;
        let n = state.next_id();
        let access = format!("mock-access-{user}-{n}");
        state.access_tokens.insert(access.clone(), user);
        Ok(SecretString::from(access))
    }

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("products")?;
        Ok(state
            .products
            .iter()
            .filter(|p| p.is_available)
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect())
    }

    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("product")?;
        state
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
    }

    async fn robots(&self, token: &AccessToken, for_rental: bool) -> Result<Vec<Robot>, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robots")?;
        let user = state.user_for(token)?;

        Ok(state
            .robots
            .iter()
            .filter(|r| {
                if for_rental {
                    r.owner_id.is_none() || r.owner_id == Some(user.id)
                } else {
                    user.role != Role::Customer || r.owner_id == Some(user.id)
                }
            })
            .cloned()
            .collect())
    }

    async fn robot(&self, token: &AccessToken, id: RobotId) -> Result<Robot, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robot")?;
        state.user_for(token)?;
        state.robot_mut(id).cloned()
    }

    async fn robot_status(
        &self,
        token: &AccessToken,
        id: RobotId,
    ) -> Result<RobotTelemetry, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robot_status")?;
        state.user_for(token)?;
        let robot = state.robot_mut(id)?;

        let connected = robot.status == RobotStatus::Active;
        Ok(RobotTelemetry {
            robot_id: robot.id,
            connected,
            battery: robot.battery,
            position: robot.current_position.unwrap_or_default(),
            sensors: SensorReadings {
                temperature: Some(29.5),
                ph: Some(7.9),
                water_quality: Some(82.0),
            },
            speed: if connected { 1.2 } else { 0.0 },
            status: robot.status,
            timestamp: Some(Utc::now()),
        })
    }

    async fn robot_start(&self, token: &AccessToken, id: RobotId) -> Result<ControlAck, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robot_start")?;
        state.operator_for(token)?;
        let robot = state.robot_mut(id)?;

        if robot.status == RobotStatus::Active {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Robot is already active".to_string(),
            });
        }
        robot.status = RobotStatus::Active;

        Ok(ControlAck {
            message: "Robot started successfully".to_string(),
            robot_id: Some(id),
            status: Some(RobotStatus::Active),
            mode: None,
            command_id: None,
        })
    }

    async fn robot_stop(&self, token: &AccessToken, id: RobotId) -> Result<ControlAck, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robot_stop")?;
        state.operator_for(token)?;
        state.robot_mut(id)?.status = RobotStatus::Offline;

        Ok(ControlAck {
            message: "Robot stopped successfully".to_string(),
            robot_id: Some(id),
            status: Some(RobotStatus::Offline),
            mode: None,
            command_id: None,
        })
    }

    async fn robot_manual(
        &self,
        token: &AccessToken,
        id: RobotId,
        command: ManualCommand,
    ) -> Result<ControlAck, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robot_manual")?;
        state.operator_for(token)?;
        let n = state.next_id();
        let robot = state.robot_mut(id)?;

        if robot.status != RobotStatus::Active {
            return Err(ApiError::Rejected {
                status: 400,
                message: "Robot is not active".to_string(),
            });
        }
        if command.speed > 0 {
            robot.battery = robot.battery.saturating_sub(1);
        }

        Ok(ControlAck {
            message: "Command executed".to_string(),
            robot_id: Some(id),
            status: None,
            mode: None,
            command_id: Some(format!("cmd_{id}_{n}")),
        })
    }

    async fn robot_mode(
        &self,
        token: &AccessToken,
        id: RobotId,
        mode: ControlMode,
    ) -> Result<ControlAck, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("robot_mode")?;
        state.operator_for(token)?;
        state.robot_mut(id)?;

        Ok(ControlAck {
            message: format!("Mode switched to {mode}"),
            robot_id: Some(id),
            status: None,
            mode: Some(mode),
            command_id: None,
        })
    }

    async fn bookings(
        &self,
        token: &AccessToken,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("bookings")?;
        let user = state.user_for(token)?;

        let mut bookings: Vec<Booking> = state
            .bookings
            .iter()
            .filter(|b| b.user_id == user.id)
            .filter(|b| status.is_none_or(|s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }

    async fn booking(&self, token: &AccessToken, id: BookingId) -> Result<Booking, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("booking")?;
        let user = state.user_for(token)?;

        let booking = state
            .bookings
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;
        if booking.user_id != user.id {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }
        Ok(booking.clone())
    }

    async fn create_booking(
        &self,
        token: &AccessToken,
        request: &BookingRequest,
    ) -> Result<Booking, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("create_booking")?;
        let user = state.user_for(token)?;

        let total_cost = match request.target() {
            BookingTarget::Purchase { product_id } => {
                if !access::can_purchase(Some(&user)) {
                    return Err(ApiError::Forbidden(
                        "Certification required to purchase".to_string(),
                    ));
                }
                state
                    .products
                    .iter()
                    .find(|p| p.id == product_id)
                    .map(|p| p.price)
                    .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?
            }
            BookingTarget::Rental {
                robot_id,
                duration_days,
            } => {
                state.robot_mut(robot_id)?;
                compute_rental_price(duration_days.get(), Decimal::from(DEFAULT_DAILY_RATE_IDR))
            }
        };

        let booking = Booking {
            id: BookingId::new(state.next_id()),
            user_id: user.id,
            target: request.target(),
            start_date: request.start_date(),
            end_date: request.end_date(),
            location: Some(request.location().to_string()),
            status: BookingStatus::Pending,
            total_cost,
            created_at: Some(Utc::now()),
        };
        state.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn create_payment(
        &self,
        token: &AccessToken,
        booking: BookingId,
        method: PaymentMethod,
    ) -> Result<Payment, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("create_payment")?;
        let user = state.user_for(token)?;
        let payment_id = PaymentId::new(state.next_id());

        let record = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking)
            .ok_or_else(|| ApiError::NotFound(format!("Booking {booking} not found")))?;
        if record.user_id != user.id {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }
        record.status = BookingStatus::Confirmed;

        let now = Utc::now();
        Ok(Payment {
            id: payment_id,
            booking_id: booking,
            amount: record.total_cost,
            method,
            status: PaymentStatus::Completed,
            paid_at: Some(now),
            transaction_id: Some(format!("TXN{booking}{}", now.timestamp())),
        })
    }

    async fn certification_modules(&self) -> Result<Vec<CertificationModule>, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("certification_modules")?;
        let mut modules = state.modules.clone();
        modules.sort_by_key(|m| m.order_index);
        Ok(modules)
    }

    async fn certification_progress(
        &self,
        token: &AccessToken,
    ) -> Result<CertificationProgress, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("certification_progress")?;
        let user = state.user_for(token)?;
        Ok(state.progress_for(&user))
    }

    async fn update_module_progress(
        &self,
        token: &AccessToken,
        module: ModuleId,
        progress: CertificationLevel,
        completed: bool,
    ) -> Result<ModuleProgressUpdate, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("update_module_progress")?;
        let user = state.user_for(token)?;

        if !state.modules.iter().any(|m| m.id == module) {
            return Err(ApiError::NotFound(format!("Module {module} not found")));
        }

        let level = if completed {
            CertificationLevel::COMPLETE
        } else {
            progress
        };
        state.progress.insert((user.id, module), level);

        Ok(ModuleProgressUpdate {
            module_id: module,
            completed: level.is_complete(),
            progress_percentage: level,
            completed_at: level.is_complete().then(Utc::now),
        })
    }

    async fn complete_certification(&self, token: &AccessToken) -> Result<Certificate, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("complete_certification")?;
        let user = state.user_for(token)?;

        let module_ids: Vec<ModuleId> = state.modules.iter().map(|m| m.id).collect();
        for module in module_ids {
            state
                .progress
                .insert((user.id, module), CertificationLevel::COMPLETE);
        }
        if let Some(account) = state.accounts.iter_mut().find(|a| a.user.id == user.id) {
            account.user.is_certified = true;
        }

        let now = Utc::now();
        Ok(Certificate {
            id: CertificateId::new(state.next_id()),
            user_id: user.id,
            cert_type: "Operator Certification".to_string(),
            issued_date: now,
            expiry_date: None,
            status: "active".to_string(),
            cert_number: format!("SEAL-{}-{}", user.id, now.timestamp()),
        })
    }

    async fn dashboard_overview(
        &self,
        token: &AccessToken,
    ) -> Result<DashboardOverview, ApiError> {
        let mut state = self.state.lock().await;
        state.enter("dashboard_overview")?;
        state.admin_for(token)?;

        let robots_total = u32::try_from(state.robots.len()).unwrap_or(u32::MAX);
        let robots_active = u32::try_from(
            state
                .robots
                .iter()
                .filter(|r| r.status == RobotStatus::Active)
                .count(),
        )
        .unwrap_or(u32::MAX);

        Ok(DashboardOverview {
            robots_active,
            robots_total,
            area_cleaned_today: 1_250.0,
            waste_collected_today: 48.5,
            energy_efficiency: 92.0,
            water_quality_avg: 7.8,
            recent_activity: vec![ActivityEntry {
                id: 1,
                time: Some("08:15".to_string()),
                activity: "CleanBot CB-001 memulai misi pembersihan".to_string(),
                status: "success".to_string(),
            }],
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use sealen_core::pricing::RentalDays;

    use super::*;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Email::parse(email).unwrap(),
            password: SecretString::from(password.to_string()),
        }
    }

    async fn login(api: &MockApi, email: &str, password: &str) -> AccessToken {
        api.login(&credentials(email, password))
            .await
            .unwrap()
            .tokens
            .access
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let api = MockApi::seeded();
        let err = api
            .login(&credentials("admin@sealen.id", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());

        let token = login(&api, "admin@sealen.id", "Admin123").await;
        assert_eq!(api.current_user(&token).await.unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let api = MockApi::seeded();
        let token = login(&api, "customer@sealen.id", "Customer123").await;
        api.logout(&token).await.unwrap();
        assert!(api.current_user(&token).await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_refresh_issues_working_token() {
        let api = MockApi::seeded();
        let auth = api
            .login(&credentials("customer@sealen.id", "Customer123"))
            .await
            .unwrap();
        api.expire_tokens().await;

        let fresh = api
            .refresh_token(auth.tokens.refresh.as_ref().unwrap())
            .await
            .unwrap();
        assert!(api.current_user(&fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_dashboard_requires_admin() {
        let api = MockApi::seeded();
        let operator = login(&api, "operator@sealen.id", "Operator123").await;
        let err = api.dashboard_overview(&operator).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let admin = login(&api, "admin@sealen.id", "Admin123").await;
        let overview = api.dashboard_overview(&admin).await.unwrap();
        assert_eq!(overview.robots_total, 4);
    }

    #[tokio::test]
    async fn test_control_requires_operator() {
        let api = MockApi::seeded();
        let customer = login(&api, "customer@sealen.id", "Customer123").await;
        let err = api.robot_start(&customer, RobotId::new(2)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let operator = login(&api, "operator@sealen.id", "Operator123").await;
        let ack = api.robot_start(&operator, RobotId::new(2)).await.unwrap();
        assert_eq!(ack.status, Some(RobotStatus::Active));

        let err = api.robot_start(&operator, RobotId::new(2)).await.unwrap_err();
        assert_eq!(err.server_message(), Some("Robot is already active"));
    }

    #[tokio::test]
    async fn test_manual_drive_needs_active_robot() {
        let api = MockApi::seeded();
        let operator = login(&api, "operator@sealen.id", "Operator123").await;
        let command = ManualCommand::new(sealen_core::Direction::Forward, 50);

        assert!(api.robot_manual(&operator, RobotId::new(2), command).await.is_err());

        let before = api.robot(&operator, RobotId::new(1)).await.unwrap().battery;
        api.robot_manual(&operator, RobotId::new(1), command)
            .await
            .unwrap();
        let after = api.robot(&operator, RobotId::new(1)).await.unwrap().battery;
        assert_eq!(after, before - 1);
    }

    #[tokio::test]
    async fn test_rental_booking_and_payment() {
        let api = MockApi::seeded();
        let token = login(&api, "customer@sealen.id", "Customer123").await;
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let request = BookingRequest::rental(
            RobotId::new(2),
            RentalDays::new(30).unwrap(),
            start,
            "Pantai Ancol",
        );

        let booking = api.create_booking(&token, &request).await.unwrap();
        assert_eq!(booking.total_cost, Decimal::from(40_500_000));
        assert_eq!(booking.status, BookingStatus::Pending);

        let payment = api
            .create_payment(&token, booking.id, PaymentMethod::EWallet)
            .await
            .unwrap();
        assert_eq!(payment.amount, booking.total_cost);

        let confirmed = api
            .bookings(&token, Some(BookingStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
    }

    #[tokio::test]
    async fn test_bookings_are_private() {
        let api = MockApi::seeded();
        let owner = login(&api, "certified@sealen.id", "Certified123").await;
        let other = login(&api, "customer@sealen.id", "Customer123").await;
        let buyer = api.current_user(&owner).await.unwrap();

        let request =
            BookingRequest::purchase(&buyer, ProductId::new(1), Utc::now(), "Jakarta").unwrap();
        let booking = api.create_booking(&owner, &request).await.unwrap();

        assert!(api.bookings(&other, None).await.unwrap().is_empty());
        assert!(matches!(
            api.booking(&other, booking.id).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            api.create_payment(&other, booking.id, PaymentMethod::CreditCard)
                .await
                .unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn test_certification_progress_and_completion() {
        let api = MockApi::seeded();
        let token = login(&api, "customer@sealen.id", "Customer123").await;

        api.update_module_progress(&token, ModuleId::new(1), CertificationLevel::COMPLETE, true)
            .await
            .unwrap();
        let progress = api.certification_progress(&token).await.unwrap();
        assert_eq!(progress.completed_modules, 1);
        assert_eq!(progress.total_modules, 4);
        assert_eq!(progress.overall_progress.percent(), 25);
        assert!(!progress.is_certified);

        let cert = api.complete_certification(&token).await.unwrap();
        assert!(cert.cert_number.starts_with("SEAL-"));
        assert!(api.current_user(&token).await.unwrap().is_certified);
        assert!(api.certification_progress(&token).await.unwrap().is_certified);
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_log() {
        let api = MockApi::seeded();
        api.fail("products").await;
        assert!(matches!(
            api.products(None).await.unwrap_err(),
            ApiError::Server { status: 503, .. }
        ));
        api.recover("products").await;
        assert_eq!(api.products(Some("robot")).await.unwrap().len(), 2);
        assert_eq!(api.calls().await, vec!["products", "products"]);
    }
}
