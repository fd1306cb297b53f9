//! # StudioBook Shared Library
//!
//! Domain types, persistence and booking rules used by the StudioBook API.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `booking`: Reservation admission, pricing and lifecycle rules
//! - `auth`: Tokens, password hashing and authorization checks
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod booking;
pub mod db;
pub mod models;

/// Current version of the StudioBook shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
