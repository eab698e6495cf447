//! Sealen Core - Shared domain library.
//!
//! This crate provides the domain types and rules used by every Sealen
//! component:
//! - `client` - API client, session guard and user flows
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types, pure predicates and pure arithmetic -
//! no I/O, no HTTP clients, no clocks except where a caller passes one in.
//! This keeps the access and pricing rules trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles and statuses
//! - [`models`] - Users, products, robots, bookings and certification records
//! - [`access`] - Purchase, control-panel and dashboard access rules
//! - [`pricing`] - Rental pricing with tiered long-term discounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod models;
pub mod pricing;
pub mod types;

pub use models::*;
pub use types::*;
