//! Harmonia - appointment booking backend
//!
//! Customers book sessions with providers, pay for them, and hold a
//! subscription that gates booking. The crate is the service core:
//! request authorization (token, role, ownership), webhook signature
//! verification, and idempotent reconciliation of payment processor events
//! into local billing state.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
