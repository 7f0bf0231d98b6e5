//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/v1/payments/checkout` - Start paying for an appointment
//! - `POST /api/v1/payments/onboarding` - Connect a provider for payouts
//! - `POST /api/v1/subscriptions/checkout` - Start a subscription checkout
//! - `GET /api/v1/subscriptions/status` - Caller's subscription state
//! - `POST /api/v1/payments/webhook` - Processor events for payments
//! - `POST /api/v1/subscriptions/webhook` - Processor events for subscriptions

pub mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::SIGNATURE_HEADER;
pub use routes::{billing_routes, webhook_routes};
