//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, roles, errors, state machines)
//! - `appointment` - Bookings between customers and providers
//! - `billing` - Payment and subscription records, webhook events, transitions

pub mod appointment;
pub mod billing;
pub mod foundation;
