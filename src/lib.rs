//! bonuscore: loyalty points back-end.
//!
//! An HTTP JSON API over PostgreSQL. Submitted order numbers feed a
//! single in-process accrual coordinator that polls the external accrual
//! authority, honors its rate-limit windows, and reconciles verdicts into
//! the store atomically with the matching balance credit.
//!
//! # Modules
//!
//! - [`config`] - CLI flags and environment variables
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - connection pool and schema bootstrap
//! - [`models`] - accrual statuses, orders, withdrawals
//! - [`luhn`] - order-number checksum
//! - [`store`] - all database operations
//! - [`accrual`] - authority client, job buffer, coordinator
//! - [`user_auth`] - registration, login, JWT middleware
//! - [`gateway`] - router, handlers, DTOs

pub mod accrual;
pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod luhn;
pub mod models;
pub mod store;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use models::{AccrualStatus, Order, Withdrawal};
pub use store::{Store, StoreError};
