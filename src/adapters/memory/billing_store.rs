//! In-memory implementation of BillingStore.
//!
//! One `tokio::sync::Mutex` guards every table, so each `apply` is a
//! critical section. Outcomes match the PostgreSQL adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::billing::{
    ApplyOutcome, PaymentRecord, PaymentStatus, SubscriptionRecord, SubscriptionStatus,
    Transition,
};
use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, EventId, SubjectId, Timestamp,
};
use crate::ports::{BillingStore, PendingPayment, PendingSubscription, SubscriptionReader};

#[derive(Debug, Default)]
struct Tables {
    payments: HashMap<AppointmentId, PaymentRecord>,
    subscriptions: HashMap<SubjectId, SubscriptionRecord>,
    processed_events: HashMap<EventId, String>,
    provider_accounts: HashMap<i64, String>,
}

impl Tables {
    fn transition(&mut self, transition: &Transition) -> ApplyOutcome {
        match transition {
            Transition::MarkPaymentPaid {
                appointment_id,
                payment_intent_id,
            } => match self.payments.get_mut(appointment_id) {
                None => ApplyOutcome::Unmatched,
                Some(payment) if transition.accepts_payment(payment.status) => {
                    payment.status = PaymentStatus::Paid;
                    payment.external_payment_id = payment_intent_id.clone();
                    payment.updated_at = Timestamp::now_after(&payment.updated_at);
                    ApplyOutcome::Applied
                }
                Some(_) => ApplyOutcome::Stale,
            },

            Transition::MarkPaymentFailed {
                appointment_id,
                payment_intent_id,
            } => match self.payments.get_mut(appointment_id) {
                None => ApplyOutcome::Unmatched,
                Some(payment)
                    if payment.external_payment_id == *payment_intent_id
                        && transition.accepts_payment(payment.status) =>
                {
                    payment.status = PaymentStatus::Failed;
                    payment.updated_at = Timestamp::now_after(&payment.updated_at);
                    ApplyOutcome::Applied
                }
                Some(_) => ApplyOutcome::Stale,
            },

            Transition::ActivateSubscription {
                user_id,
                session_id,
                subscription_id,
            } => match self.subscriptions.get_mut(user_id) {
                None => ApplyOutcome::Unmatched,
                Some(record) if transition.accepts_subscription(record.status) => {
                    record.status = SubscriptionStatus::Active;
                    record.external_session_id = session_id.clone();
                    if subscription_id.is_some() {
                        record.external_subscription_id = subscription_id.clone();
                    }
                    record.updated_at = Timestamp::now_after(&record.updated_at);
                    ApplyOutcome::Applied
                }
                Some(_) => ApplyOutcome::Stale,
            },

            Transition::CancelSubscription {
                subscription_id,
                user_id,
            } => {
                let user_id = user_id.as_ref();
                let target = self.subscriptions.values_mut().find(|r| {
                    transition.accepts_subscription(r.status)
                        && (holds_subscription(r, subscription_id)
                            || (r.external_subscription_id.is_none() && belongs_to(r, user_id)))
                });

                if let Some(record) = target {
                    record.status = SubscriptionStatus::Canceled;
                    record
                        .external_subscription_id
                        .get_or_insert_with(|| subscription_id.clone());
                    record.updated_at = Timestamp::now_after(&record.updated_at);
                    return ApplyOutcome::Applied;
                }

                let exists = self.subscriptions.values().any(|r| {
                    holds_subscription(r, subscription_id) || belongs_to(r, user_id)
                });
                if exists {
                    ApplyOutcome::Stale
                } else {
                    ApplyOutcome::Unmatched
                }
            }
        }
    }
}

fn holds_subscription(record: &SubscriptionRecord, subscription_id: &str) -> bool {
    record.external_subscription_id.as_deref() == Some(subscription_id)
}

fn belongs_to(record: &SubscriptionRecord, user_id: Option<&SubjectId>) -> bool {
    user_id == Some(&record.user_id)
}

/// In-memory billing store for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryBillingStore {
    tables: Mutex<Tables>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider's connected payout account.
    pub fn with_provider_account(mut self, provider_id: i64, account: impl Into<String>) -> Self {
        self.tables
            .get_mut()
            .provider_accounts
            .insert(provider_id, account.into());
        self
    }

    /// Number of recorded event ids.
    pub async fn processed_count(&self) -> usize {
        self.tables.lock().await.processed_events.len()
    }
}

#[async_trait]
impl SubscriptionReader for InMemoryBillingStore {
    async fn subscription_status(
        &self,
        user_id: &SubjectId,
    ) -> Result<Option<SubscriptionStatus>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .subscriptions
            .get(user_id)
            .map(|r| r.status))
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn apply(
        &self,
        event_id: &EventId,
        transition: &Transition,
    ) -> Result<ApplyOutcome, DomainError> {
        let mut tables = self.tables.lock().await;

        if tables.processed_events.contains_key(event_id) {
            return Ok(ApplyOutcome::AlreadyProcessed);
        }

        let outcome = tables.transition(transition);
        if outcome.is_recorded() {
            tables
                .processed_events
                .insert(event_id.clone(), transition.resource_key());
        }

        Ok(outcome)
    }

    async fn is_processed(&self, event_id: &EventId) -> Result<bool, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .processed_events
            .contains_key(event_id))
    }

    async fn upsert_pending_payment(
        &self,
        payment: &PendingPayment,
    ) -> Result<PaymentRecord, DomainError> {
        let mut tables = self.tables.lock().await;
        let now = Timestamp::now();

        let record = match tables.payments.get(&payment.appointment_id) {
            Some(existing) if existing.status == PaymentStatus::Paid => {
                return Err(DomainError::new(
                    ErrorCode::PaymentAlreadyCompleted,
                    format!(
                        "Appointment {} has already been paid",
                        payment.appointment_id
                    ),
                ));
            }
            Some(existing) => PaymentRecord {
                amount: payment.amount,
                currency: payment.currency.clone(),
                status: PaymentStatus::Pending,
                external_payment_id: payment.external_payment_id.clone(),
                updated_at: Timestamp::now_after(&existing.updated_at),
                ..existing.clone()
            },
            None => PaymentRecord {
                appointment_id: payment.appointment_id,
                amount: payment.amount,
                currency: payment.currency.clone(),
                status: PaymentStatus::Pending,
                external_payment_id: payment.external_payment_id.clone(),
                created_at: now,
                updated_at: now,
            },
        };

        tables.payments.insert(payment.appointment_id, record.clone());
        Ok(record)
    }

    async fn upsert_pending_subscription(
        &self,
        subscription: &PendingSubscription,
    ) -> Result<SubscriptionRecord, DomainError> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables.subscriptions.get(&subscription.user_id) {
            if existing.status == SubscriptionStatus::Active {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionAlreadyActive,
                    "Subscription is already active",
                ));
            }
        }

        let now = Timestamp::now();
        let record = SubscriptionRecord {
            user_id: subscription.user_id.clone(),
            external_session_id: subscription.external_session_id.clone(),
            external_subscription_id: None,
            plan_id: subscription.plan_id.clone(),
            status: SubscriptionStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        tables
            .subscriptions
            .insert(subscription.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_payment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.tables.lock().await.payments.get(&appointment_id).cloned())
    }

    async fn find_subscription(
        &self,
        user_id: &SubjectId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self.tables.lock().await.subscriptions.get(user_id).cloned())
    }

    async fn provider_account(&self, provider_id: i64) -> Result<Option<String>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .provider_accounts
            .get(&provider_id)
            .cloned())
    }

    async fn save_provider_account(
        &self,
        provider_id: i64,
        account_id: &str,
    ) -> Result<(), DomainError> {
        self.tables
            .lock()
            .await
            .provider_accounts
            .insert(provider_id, account_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> SubjectId {
        SubjectId::new(id).unwrap()
    }

    fn event(id: &str) -> EventId {
        EventId::new(id).unwrap()
    }

    async fn store_with_pending_subscription() -> InMemoryBillingStore {
        let store = InMemoryBillingStore::new();
        store
            .upsert_pending_subscription(&PendingSubscription {
                user_id: user("42"),
                external_session_id: "cs_1".to_string(),
                plan_id: "price_x".to_string(),
            })
            .await
            .unwrap();
        store
    }

    fn activate() -> Transition {
        Transition::ActivateSubscription {
            user_id: user("42"),
            session_id: "cs_1".to_string(),
            subscription_id: Some("sub_1".to_string()),
        }
    }

    fn cancel(user_id: Option<&str>) -> Transition {
        Transition::CancelSubscription {
            subscription_id: "sub_1".to_string(),
            user_id: user_id.map(user),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotence
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn replay_leaves_record_untouched() {
        let store = store_with_pending_subscription().await;

        assert_eq!(store.apply(&event("evt_1"), &activate()).await.unwrap(), ApplyOutcome::Applied);
        let after_first = store.find_subscription(&user("42")).await.unwrap();

        assert_eq!(
            store.apply(&event("evt_1"), &activate()).await.unwrap(),
            ApplyOutcome::AlreadyProcessed
        );
        assert_eq!(store.find_subscription(&user("42")).await.unwrap(), after_first);
    }

    #[tokio::test]
    async fn unmatched_events_are_not_recorded() {
        let store = InMemoryBillingStore::new();

        assert_eq!(
            store.apply(&event("evt_1"), &activate()).await.unwrap(),
            ApplyOutcome::Unmatched
        );
        assert!(!store.is_processed(&event("evt_1")).await.unwrap());
    }

    #[tokio::test]
    async fn stale_events_are_recorded() {
        let store = store_with_pending_subscription().await;
        store.apply(&event("evt_1"), &activate()).await.unwrap();

        assert_eq!(
            store.apply(&event("evt_2"), &activate()).await.unwrap(),
            ApplyOutcome::Stale
        );
        assert!(store.is_processed(&event("evt_2")).await.unwrap());
        assert_eq!(store.processed_count().await, 2);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Ordering
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_then_complete_stays_canceled() {
        let store = store_with_pending_subscription().await;

        assert_eq!(
            store.apply(&event("evt_del"), &cancel(Some("42"))).await.unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.apply(&event("evt_done"), &activate()).await.unwrap(),
            ApplyOutcome::Stale
        );

        let record = store.find_subscription(&user("42")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
    }

    #[tokio::test]
    async fn cancel_matches_by_subscription_id_once_known() {
        let store = store_with_pending_subscription().await;
        store.apply(&event("evt_done"), &activate()).await.unwrap();

        assert_eq!(
            store.apply(&event("evt_del"), &cancel(None)).await.unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.subscription_status(&user("42")).await.unwrap(),
            Some(SubscriptionStatus::Canceled)
        );
    }

    #[tokio::test]
    async fn paid_completion_of_earlier_session_activates() {
        let store = store_with_pending_subscription().await;
        store
            .upsert_pending_subscription(&PendingSubscription {
                user_id: user("42"),
                external_session_id: "cs_2".to_string(),
                plan_id: "price_x".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            store.apply(&event("evt_cs_1"), &activate()).await.unwrap(),
            ApplyOutcome::Applied
        );

        let record = store.find_subscription(&user("42")).await.unwrap().unwrap();
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.external_session_id, "cs_1");
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payments
    // ════════════════════════════════════════════════════════════════════════════

    fn pending(intent: &str) -> PendingPayment {
        PendingPayment {
            appointment_id: AppointmentId::new(5),
            amount: 5000,
            currency: "usd".to_string(),
            external_payment_id: intent.to_string(),
        }
    }

    #[tokio::test]
    async fn failure_of_superseded_intent_is_stale() {
        let store = InMemoryBillingStore::new();
        store.upsert_pending_payment(&pending("pi_old")).await.unwrap();
        store.upsert_pending_payment(&pending("pi_new")).await.unwrap();

        let failed = Transition::MarkPaymentFailed {
            appointment_id: AppointmentId::new(5),
            payment_intent_id: "pi_old".to_string(),
        };
        assert_eq!(store.apply(&event("evt_f"), &failed).await.unwrap(), ApplyOutcome::Stale);
        assert_eq!(
            store.find_payment(AppointmentId::new(5)).await.unwrap().unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn paid_payment_rejects_new_checkout() {
        let store = InMemoryBillingStore::new();
        store.upsert_pending_payment(&pending("pi_1")).await.unwrap();
        let paid = Transition::MarkPaymentPaid {
            appointment_id: AppointmentId::new(5),
            payment_intent_id: "pi_1".to_string(),
        };
        store.apply(&event("evt_p"), &paid).await.unwrap();

        let err = store.upsert_pending_payment(&pending("pi_2")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentAlreadyCompleted);
    }

    #[tokio::test]
    async fn active_subscription_rejects_new_checkout() {
        let store = store_with_pending_subscription().await;
        store.apply(&event("evt_1"), &activate()).await.unwrap();

        let err = store
            .upsert_pending_subscription(&PendingSubscription {
                user_id: user("42"),
                external_session_id: "cs_2".to_string(),
                plan_id: "price_x".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionAlreadyActive);
    }

    #[tokio::test]
    async fn provider_accounts_are_looked_up_by_id() {
        let store = InMemoryBillingStore::new().with_provider_account(30, "acct_30");
        assert_eq!(store.provider_account(30).await.unwrap().as_deref(), Some("acct_30"));
        assert_eq!(store.provider_account(31).await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_provider_account_replaces_earlier_one() {
        let store = InMemoryBillingStore::new();
        store.save_provider_account(31, "acct_a").await.unwrap();
        store.save_provider_account(31, "acct_b").await.unwrap();
        assert_eq!(store.provider_account(31).await.unwrap().as_deref(), Some("acct_b"));
    }
}
