//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Clerk token verification and directory lookups
//! - `postgres` - PostgreSQL repositories (sqlx)
//! - `memory` - In-memory repositories for tests and local runs
//! - `stripe` - Stripe REST client
//! - `http` - axum REST API

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
