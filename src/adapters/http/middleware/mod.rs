//! HTTP middleware for axum.
//!
//! This module contains middleware layers for cross-cutting concerns:
//!
//! - `auth` - Authorization gate middleware and the principal extractor
//! - `guards` - Role and ownership checks applied per route

pub mod auth;
pub mod guards;

pub use auth::{auth_middleware, AuthRejection, RequirePrincipal};
pub use guards::{require_ownership, require_role};
