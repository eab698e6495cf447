//! Sealen Client - API access, session handling and user flows.
//!
//! This crate sits between a front end (the `sealen` CLI) and the Sealen
//! REST API:
//! - [`config`] - Environment-driven configuration
//! - [`api`] - The [`MarineApi`](api::MarineApi) capability trait with HTTP
//!   and in-memory implementations
//! - [`session`] - The session guard and token persistence
//! - [`routes`] - Closed page and route sets with synchronous guards
//! - [`forms`] - Login, registration and rental form validation
//! - [`services`] - Booking, certification, robot and dashboard flows
//! - [`error`] - Unified error type, user notices and Sentry helpers
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let api = api::connect(&config)?;
//! let mut guard = SessionGuard::new(FileSessionStore::new(&config.session_file));
//! guard.restore(api.as_ref()).await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod routes;
pub mod services;
pub mod session;

pub use api::{MarineApi, connect};
pub use config::{Backend, ClientConfig, ConfigError};
pub use error::{ClientError, Notice, NoticeLevel};
pub use routes::{Navigation, Page, ShellRoute};
pub use session::{FileSessionStore, MemorySessionStore, SessionGuard, SessionState};
