//! User flows built on the API and the session guard.
//!
//! # Services
//!
//! - `booking` - Purchases, rentals and booking history
//! - `certification` - Operator course progress and certificates
//! - `robot` - Robot control console (admins and operators)
//! - `dashboard` - Fleet metrics (admins)
//!
//! Each service borrows a [`MarineApi`](crate::api::MarineApi) and is handed
//! the [`SessionGuard`](crate::session::SessionGuard) per call, so access
//! rules are checked against the user at the moment of the call.

pub mod booking;
pub mod certification;
pub mod dashboard;
pub mod robot;

pub use booking::{BookingService, Receipt};
pub use certification::CertificationService;
pub use dashboard::DashboardService;
pub use robot::RobotConsole;
