//! Request guards.
//!
//! - `AuthorizationGate` - bearer header to `Principal`
//! - `RoleGuard` - role allow-list
//! - `OwnershipGuard` - principal is a party to the appointment
//! - `SubscriptionGuard` - active subscription, failing closed

mod authorization_gate;
mod ownership_guard;
mod role_guard;
mod subscription_guard;

pub use authorization_gate::{bearer_token, AuthorizationGate, DEFAULT_UPSTREAM_TIMEOUT};
pub use ownership_guard::OwnershipGuard;
pub use role_guard::RoleGuard;
pub use subscription_guard::SubscriptionGuard;
