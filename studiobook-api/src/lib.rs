//! # StudioBook API Server Library
//!
//! Core of the StudioBook HTTP server: studio, equipment and reservation
//! management over a PostgreSQL store.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors answering with the error envelope
//! - `middleware`: Security headers and rate limiting
//! - `response`: Success envelope and pagination
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
