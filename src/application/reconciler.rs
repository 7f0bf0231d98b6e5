//! BillingStateReconciler - applies verified webhook events to billing records.
//!
//! Pipeline per delivery:
//!
//! 1. Verify the signature over the raw body (before any JSON parsing).
//! 2. Parse the envelope and drop events belonging to the other endpoint.
//! 3. Decode the object into a `BillingEvent` and map it to a `Transition`.
//! 4. `BillingStore::apply` the transition under the event id.
//!
//! Every outcome after step 1 is acknowledged except a store failure, which
//! is returned so the processor redelivers.

use std::fmt;
use std::sync::Arc;

use crate::domain::billing::{
    concern_of, ApplyOutcome, BillingConcern, BillingEvent, StripeEvent, Transition, WebhookError,
    WebhookVerifier,
};
use crate::domain::foundation::EventId;
use crate::ports::BillingStore;

/// Why an event was acknowledged without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event type handled by the other webhook endpoint.
    OtherConcern,
    /// Event type outside the closed set.
    Unsupported,
    /// Known type, but nothing to do (e.g. an unpaid checkout).
    NoTransition,
    /// Known type whose object lacks required fields.
    Undecodable,
}

/// Result of reconciling one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A transition reached the store.
    Transition(ApplyOutcome),
    Ignored(IgnoreReason),
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Transition(outcome) => write!(f, "{}", outcome),
            ReconcileOutcome::Ignored(reason) => write!(f, "ignored ({:?})", reason),
        }
    }
}

/// Converts signed processor events into billing state.
pub struct BillingStateReconciler {
    verifier: WebhookVerifier,
    store: Arc<dyn BillingStore>,
}

impl BillingStateReconciler {
    pub fn new(verifier: WebhookVerifier, store: Arc<dyn BillingStore>) -> Self {
        Self { verifier, store }
    }

    /// Reconciles one delivery for the given endpoint concern.
    ///
    /// # Errors
    ///
    /// - signature family and `ParseError`: rejected, nothing touched
    /// - `Storage`: store failed, nothing committed
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        concern: BillingConcern,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;

        let event = self
            .verifier
            .verify_and_parse(payload, signature)
            .map_err(|e| {
                if e.is_signature_failure() {
                    tracing::warn!(error = %e, "Webhook signature rejected");
                } else {
                    tracing::warn!(error = %e, "Webhook envelope rejected");
                }
                e
            })?;

        self.reconcile(&event, concern).await
    }

    /// Applies an already verified event.
    pub async fn reconcile(
        &self,
        event: &StripeEvent,
        concern: BillingConcern,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let event_id = EventId::new(event.id.as_str())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        match concern_of(&event.event_type) {
            None => {
                tracing::debug!(
                    event_id = %event_id,
                    event_type = %event.event_type,
                    "Unsupported webhook event type"
                );
                return Ok(ReconcileOutcome::Ignored(IgnoreReason::Unsupported));
            }
            Some(c) if c != concern => {
                tracing::debug!(
                    event_id = %event_id,
                    event_type = %event.event_type,
                    "Webhook event belongs to another endpoint"
                );
                return Ok(ReconcileOutcome::Ignored(IgnoreReason::OtherConcern));
            }
            Some(_) => {}
        }

        if self.store.is_processed(&event_id).await.map_err(storage)? {
            tracing::debug!(event_id = %event_id, "Duplicate webhook delivery");
            return Ok(ReconcileOutcome::Transition(ApplyOutcome::AlreadyProcessed));
        }

        let decoded = match BillingEvent::decode(event) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    event_id = %event_id,
                    event_type = %event.event_type,
                    error = %e,
                    "Webhook event cannot be decoded, acknowledging"
                );
                return Ok(ReconcileOutcome::Ignored(IgnoreReason::Undecodable));
            }
        };

        let Some(transition) = Transition::from_event(&decoded) else {
            tracing::info!(
                event_id = %event_id,
                event_type = %event.event_type,
                "Webhook event implies no transition"
            );
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::NoTransition));
        };

        let outcome = self
            .store
            .apply(&event_id, &transition)
            .await
            .map_err(|e| {
                tracing::error!(
                    event_id = %event_id,
                    resource = %transition.resource_key(),
                    error = %e,
                    "Failed to apply billing transition"
                );
                storage(e)
            })?;

        log_outcome(&event_id, &transition, outcome);
        Ok(ReconcileOutcome::Transition(outcome))
    }
}

fn storage(e: impl fmt::Display) -> WebhookError {
    WebhookError::Storage(e.to_string())
}

fn log_outcome(event_id: &EventId, transition: &Transition, outcome: ApplyOutcome) {
    let resource = transition.resource_key();
    let status = transition.target_status();
    match outcome {
        ApplyOutcome::Applied => {
            tracing::info!(event_id = %event_id, resource = %resource, status, "Billing transition applied")
        }
        ApplyOutcome::AlreadyProcessed => {
            tracing::debug!(event_id = %event_id, resource = %resource, "Duplicate webhook delivery")
        }
        ApplyOutcome::Stale => {
            tracing::debug!(event_id = %event_id, resource = %resource, status, "Stale billing transition skipped")
        }
        ApplyOutcome::Unmatched => {
            tracing::info!(event_id = %event_id, resource = %resource, "No billing record matches event")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{
        sign_payload, PaymentStatus, SubscriptionStatus, CHECKOUT_SESSION_COMPLETED,
        PAYMENT_INTENT_SUCCEEDED, SUBSCRIPTION_DELETED,
    };
    use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, SubjectId};
    use crate::ports::{PendingPayment, PendingSubscription, SubscriptionReader};
    use async_trait::async_trait;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";

    fn signed(body: &serde_json::Value) -> (Vec<u8>, String) {
        let payload = serde_json::to_vec(body).unwrap();
        let header = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);
        (payload, header)
    }

    fn event(id: &str, event_type: &str, object: serde_json::Value) -> serde_json::Value {
        json!({ "id": id, "type": event_type, "created": 0, "data": { "object": object } })
    }

    fn checkout_completed(id: &str, session: &str, user: &str, paid: &str) -> serde_json::Value {
        event(
            id,
            CHECKOUT_SESSION_COMPLETED,
            json!({
                "id": session,
                "subscription": "sub_1",
                "payment_status": paid,
                "metadata": { "user_id": user }
            }),
        )
    }

    fn payment_succeeded(id: &str, intent: &str, appointment: i64) -> serde_json::Value {
        event(
            id,
            PAYMENT_INTENT_SUCCEEDED,
            json!({ "id": intent, "metadata": { "appointment_id": appointment.to_string() } }),
        )
    }

    async fn store_with_pending_subscription() -> Arc<InMemoryBillingStore> {
        let store = Arc::new(InMemoryBillingStore::new());
        store
            .upsert_pending_subscription(&PendingSubscription {
                user_id: SubjectId::new("42").unwrap(),
                external_session_id: "cs_1".to_string(),
                plan_id: "price_x".to_string(),
            })
            .await
            .unwrap();
        store
    }

    fn reconciler(store: Arc<InMemoryBillingStore>) -> BillingStateReconciler {
        BillingStateReconciler::new(WebhookVerifier::new(SECRET), store)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Verification
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let store = store_with_pending_subscription().await;
        let (payload, _) = signed(&checkout_completed("evt_1", "cs_1", "42", "paid"));

        let err = reconciler(store)
            .handle(&payload, None, BillingConcern::Subscriptions)
            .await
            .unwrap_err();
        assert_eq!(err, WebhookError::MissingSignature);
    }

    #[tokio::test]
    async fn tampered_payload_is_rejected_without_mutation() {
        let store = store_with_pending_subscription().await;
        let (mut payload, header) = signed(&checkout_completed("evt_1", "cs_1", "42", "paid"));
        let last = payload.len() - 2;
        payload[last] ^= 0x01;

        let err = reconciler(store.clone())
            .handle(&payload, Some(&header), BillingConcern::Subscriptions)
            .await
            .unwrap_err();

        assert!(err.is_signature_failure());
        let status = store
            .subscription_status(&SubjectId::new("42").unwrap())
            .await
            .unwrap();
        assert_eq!(status, Some(SubscriptionStatus::Pending));
        assert_eq!(store.processed_count().await, 0);
    }

    #[tokio::test]
    async fn signed_garbage_is_a_parse_error() {
        let store = store_with_pending_subscription().await;
        let payload = b"not json".to_vec();
        let header = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);

        let err = reconciler(store)
            .handle(&payload, Some(&header), BillingConcern::Payments)
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::ParseError(_)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_checkout_activates_then_replay_is_duplicate() {
        let store = store_with_pending_subscription().await;
        let reconciler = reconciler(store.clone());
        let (payload, header) = signed(&checkout_completed("evt_1", "cs_1", "42", "paid"));

        let first = reconciler
            .handle(&payload, Some(&header), BillingConcern::Subscriptions)
            .await
            .unwrap();
        let before = store
            .find_subscription(&SubjectId::new("42").unwrap())
            .await
            .unwrap();
        let second = reconciler
            .handle(&payload, Some(&header), BillingConcern::Subscriptions)
            .await
            .unwrap();
        let after = store
            .find_subscription(&SubjectId::new("42").unwrap())
            .await
            .unwrap();

        assert_eq!(first, ReconcileOutcome::Transition(ApplyOutcome::Applied));
        assert_eq!(second, ReconcileOutcome::Transition(ApplyOutcome::AlreadyProcessed));
        assert_eq!(before.as_ref().map(|r| r.status), Some(SubscriptionStatus::Active));
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn unpaid_checkout_is_ignored() {
        let store = store_with_pending_subscription().await;
        let (payload, header) = signed(&checkout_completed("evt_1", "cs_1", "42", "unpaid"));

        let outcome = reconciler(store.clone())
            .handle(&payload, Some(&header), BillingConcern::Subscriptions)
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::NoTransition));
        assert_eq!(store.processed_count().await, 0);
    }

    #[tokio::test]
    async fn deletion_before_completion_still_ends_canceled() {
        let store = store_with_pending_subscription().await;
        let reconciler = reconciler(store.clone());
        let deleted = event(
            "evt_del",
            SUBSCRIPTION_DELETED,
            json!({ "id": "sub_1", "metadata": { "user_id": "42" } }),
        );

        for body in [deleted, checkout_completed("evt_done", "cs_1", "42", "paid")] {
            let (payload, header) = signed(&body);
            reconciler
                .handle(&payload, Some(&header), BillingConcern::Subscriptions)
                .await
                .unwrap();
        }

        let status = store
            .subscription_status(&SubjectId::new("42").unwrap())
            .await
            .unwrap();
        assert_eq!(status, Some(SubscriptionStatus::Canceled));
    }

    #[tokio::test]
    async fn payment_event_on_subscription_endpoint_is_ignored() {
        let store = store_with_pending_subscription().await;
        let (payload, header) = signed(&payment_succeeded("evt_p", "pi_1", 3));

        let outcome = reconciler(store)
            .handle(&payload, Some(&header), BillingConcern::Subscriptions)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::OtherConcern));
    }

    #[tokio::test]
    async fn unsupported_type_is_ignored() {
        let store = store_with_pending_subscription().await;
        let (payload, header) = signed(&event("evt_x", "invoice.paid", json!({ "id": "in_1" })));

        let outcome = reconciler(store)
            .handle(&payload, Some(&header), BillingConcern::Payments)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::Unsupported));
    }

    #[tokio::test]
    async fn missing_metadata_is_acknowledged() {
        let store = store_with_pending_subscription().await;
        let (payload, header) = signed(&event(
            "evt_m",
            PAYMENT_INTENT_SUCCEEDED,
            json!({ "id": "pi_1", "metadata": {} }),
        ));

        let outcome = reconciler(store)
            .handle(&payload, Some(&header), BillingConcern::Payments)
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::Undecodable));
    }

    #[tokio::test]
    async fn payment_before_pending_record_is_unmatched_then_applies() {
        let store = Arc::new(InMemoryBillingStore::new());
        let reconciler = reconciler(store.clone());
        let (payload, header) = signed(&payment_succeeded("evt_p", "pi_1", 3));

        let early = reconciler
            .handle(&payload, Some(&header), BillingConcern::Payments)
            .await
            .unwrap();
        store
            .upsert_pending_payment(&PendingPayment {
                appointment_id: AppointmentId::new(3),
                amount: 5000,
                currency: "usd".to_string(),
                external_payment_id: "pi_1".to_string(),
            })
            .await
            .unwrap();
        let redelivered = reconciler
            .handle(&payload, Some(&header), BillingConcern::Payments)
            .await
            .unwrap();

        assert_eq!(early, ReconcileOutcome::Transition(ApplyOutcome::Unmatched));
        assert_eq!(redelivered, ReconcileOutcome::Transition(ApplyOutcome::Applied));
        let payment = store.find_payment(AppointmentId::new(3)).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Concurrent delivery
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_redeliveries_apply_exactly_once() {
        let store = Arc::new(InMemoryBillingStore::new());
        store
            .upsert_pending_payment(&PendingPayment {
                appointment_id: AppointmentId::new(9),
                amount: 5000,
                currency: "usd".to_string(),
                external_payment_id: "pi_9".to_string(),
            })
            .await
            .unwrap();
        let reconciler = Arc::new(reconciler(store.clone()));
        let (payload, header) = signed(&payment_succeeded("evt_race", "pi_9", 9));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let reconciler = reconciler.clone();
                let payload = payload.clone();
                let header = header.clone();
                tokio::spawn(async move {
                    reconciler
                        .handle(&payload, Some(&header), BillingConcern::Payments)
                        .await
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap().unwrap());
        }

        let applied = outcomes
            .iter()
            .filter(|o| **o == ReconcileOutcome::Transition(ApplyOutcome::Applied))
            .count();
        let duplicates = outcomes
            .iter()
            .filter(|o| **o == ReconcileOutcome::Transition(ApplyOutcome::AlreadyProcessed))
            .count();
        assert_eq!(applied, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(store.processed_count().await, 1);
        let payment = store.find_payment(AppointmentId::new(9)).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_completion_and_deletion_end_canceled() {
        for round in 0..20 {
            let store = store_with_pending_subscription().await;
            let reconciler = Arc::new(reconciler(store.clone()));
            let completed = signed(&checkout_completed(
                &format!("evt_done_{round}"),
                "cs_1",
                "42",
                "paid",
            ));
            let deleted = signed(&event(
                &format!("evt_del_{round}"),
                SUBSCRIPTION_DELETED,
                json!({ "id": "sub_1", "metadata": { "user_id": "42" } }),
            ));

            let tasks: Vec<_> = [completed, deleted]
                .into_iter()
                .map(|(payload, header)| {
                    let reconciler = reconciler.clone();
                    tokio::spawn(async move {
                        reconciler
                            .handle(&payload, Some(&header), BillingConcern::Subscriptions)
                            .await
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            let status = store
                .subscription_status(&SubjectId::new("42").unwrap())
                .await
                .unwrap();
            assert_eq!(status, Some(SubscriptionStatus::Canceled), "round {round}");
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Store failure
    // ════════════════════════════════════════════════════════════════════════════

    struct FailingStore;

    #[async_trait]
    impl SubscriptionReader for FailingStore {
        async fn subscription_status(
            &self,
            _user_id: &SubjectId,
        ) -> Result<Option<SubscriptionStatus>, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }
    }

    #[async_trait]
    impl BillingStore for FailingStore {
        async fn apply(
            &self,
            _event_id: &EventId,
            _transition: &Transition,
        ) -> Result<ApplyOutcome, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }

        async fn is_processed(&self, _event_id: &EventId) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn upsert_pending_payment(
            &self,
            _payment: &PendingPayment,
        ) -> Result<crate::domain::billing::PaymentRecord, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }

        async fn upsert_pending_subscription(
            &self,
            _subscription: &PendingSubscription,
        ) -> Result<crate::domain::billing::SubscriptionRecord, DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }

        async fn find_payment(
            &self,
            _appointment_id: AppointmentId,
        ) -> Result<Option<crate::domain::billing::PaymentRecord>, DomainError> {
            Ok(None)
        }

        async fn find_subscription(
            &self,
            _user_id: &SubjectId,
        ) -> Result<Option<crate::domain::billing::SubscriptionRecord>, DomainError> {
            Ok(None)
        }

        async fn provider_account(&self, _provider_id: i64) -> Result<Option<String>, DomainError> {
            Ok(None)
        }

        async fn save_provider_account(
            &self,
            _provider_id: i64,
            _account_id: &str,
        ) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::DatabaseError, "down"))
        }
    }

    #[tokio::test]
    async fn store_failure_is_retryable() {
        let reconciler = BillingStateReconciler::new(WebhookVerifier::new(SECRET), Arc::new(FailingStore));
        let (payload, header) = signed(&payment_succeeded("evt_p", "pi_1", 3));

        let err = reconciler
            .handle(&payload, Some(&header), BillingConcern::Payments)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
