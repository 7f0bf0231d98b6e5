//! Application layer - Guards, Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Guards run before handlers; the reconciler runs independently on
//! webhook deliveries.

pub mod guards;
pub mod handlers;
mod reconciler;

pub use guards::{AuthorizationGate, OwnershipGuard, RoleGuard, SubscriptionGuard};
pub use reconciler::{BillingStateReconciler, IgnoreReason, ReconcileOutcome};
