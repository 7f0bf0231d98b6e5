//! Billing store port.
//!
//! Payment and subscription rows are written in exactly two ways:
//!
//! - The checkout path writes a fresh `pending` row (`upsert_pending_*`).
//! - The reconciler moves rows between statuses with [`BillingStore::apply`],
//!   a conditional update recorded in the processed-event log within the
//!   same transaction.
//!
//! Nothing else mutates these rows. Provider payout accounts are written
//! once per provider by the onboarding path.

use async_trait::async_trait;

use crate::domain::billing::{
    ApplyOutcome, PaymentRecord, SubscriptionRecord, SubscriptionStatus, Transition,
};
use crate::domain::foundation::{AppointmentId, DomainError, EventId, SubjectId};

/// Pending payment written when a payment intent is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPayment {
    pub appointment_id: AppointmentId,
    pub amount: i64,
    pub currency: String,
    pub external_payment_id: String,
}

/// Pending subscription written when a checkout session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubscription {
    pub user_id: SubjectId,
    pub external_session_id: String,
    pub plan_id: String,
}

/// Read-only view of subscription state.
///
/// The appointment-creation path only ever needs this much of the store.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    /// Current subscription status for a user, `None` if no record exists.
    async fn subscription_status(
        &self,
        user_id: &SubjectId,
    ) -> Result<Option<SubscriptionStatus>, DomainError>;
}

/// Store for payment and subscription records plus the processed-event log.
#[async_trait]
pub trait BillingStore: SubscriptionReader {
    /// Applies a transition exactly once for the given event id.
    ///
    /// The event id is recorded together with the mutation; on `Stale` it is
    /// recorded without a mutation, on `Unmatched` it is not recorded.
    async fn apply(
        &self,
        event_id: &EventId,
        transition: &Transition,
    ) -> Result<ApplyOutcome, DomainError>;

    /// Returns true if the event id is in the processed-event log.
    async fn is_processed(&self, event_id: &EventId) -> Result<bool, DomainError>;

    /// Writes the pending payment for an appointment, superseding any
    /// pending or failed one.
    ///
    /// # Errors
    ///
    /// - `PaymentAlreadyCompleted` if the appointment is already paid
    async fn upsert_pending_payment(
        &self,
        payment: &PendingPayment,
    ) -> Result<PaymentRecord, DomainError>;

    /// Writes a fresh pending subscription term for a user, replacing a
    /// pending or canceled one.
    ///
    /// # Errors
    ///
    /// - `SubscriptionAlreadyActive` if the user's subscription is active
    async fn upsert_pending_subscription(
        &self,
        subscription: &PendingSubscription,
    ) -> Result<SubscriptionRecord, DomainError>;

    async fn find_payment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    async fn find_subscription(
        &self,
        user_id: &SubjectId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Connected payout account of a provider, `None` until onboarded.
    async fn provider_account(&self, provider_id: i64) -> Result<Option<String>, DomainError>;

    /// Records the connected payout account created for a provider,
    /// replacing any earlier one.
    async fn save_provider_account(
        &self,
        provider_id: i64,
        account_id: &str,
    ) -> Result<(), DomainError>;
}
