//! PostgreSQL implementation of BillingStore.
//!
//! Each event is applied in one transaction:
//!
//! 1. `INSERT INTO processed_events ... ON CONFLICT DO NOTHING` claims the
//!    event id. A concurrent delivery of the same id blocks on the primary
//!    key until this transaction ends, then finds it taken.
//! 2. A conditional `UPDATE ... WHERE status = ANY(<sources>)` performs the
//!    transition. Row locks serialize competing transitions on one record,
//!    and the `WHERE` is re-evaluated after a competitor commits.
//! 3. If no row was updated, an existence probe decides between `Stale`
//!    (commit, the claim stands) and `Unmatched` (roll back, release it).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::billing::{
    ApplyOutcome, PaymentRecord, PaymentStatus, SubscriptionRecord, SubscriptionStatus,
    Transition,
};
use crate::domain::foundation::{
    AppointmentId, DomainError, ErrorCode, EventId, SubjectId, Timestamp,
};
use crate::ports::{BillingStore, PendingPayment, PendingSubscription, SubscriptionReader};

/// PostgreSQL implementation of the BillingStore port.
#[derive(Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    appointment_id: i64,
    amount: i64,
    currency: String,
    status: String,
    stripe_payment_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<PaymentStatus>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid payment status: {}", e))
        })?;

        Ok(PaymentRecord {
            appointment_id: AppointmentId::new(row.appointment_id),
            amount: row.amount,
            currency: row.currency,
            status,
            external_payment_id: row.stripe_payment_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    stripe_session_id: String,
    stripe_subscription_id: Option<String>,
    plan_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = parse_subscription_status(&row.status)?;
        let user_id = SubjectId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;

        Ok(SubscriptionRecord {
            user_id,
            external_session_id: row.stripe_session_id,
            external_subscription_id: row.stripe_subscription_id,
            plan_id: row.plan_id,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_subscription_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    s.parse::<SubscriptionStatus>().map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status: {}", e),
        )
    })
}

fn sources(transition: &Transition) -> Vec<String> {
    transition
        .expected_sources()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Runs the conditional update for a transition. Returns rows affected.
async fn update_conditionally(
    tx: &mut Transaction<'_, Postgres>,
    transition: &Transition,
) -> Result<u64, sqlx::Error> {
    let result = match transition {
        Transition::MarkPaymentPaid {
            appointment_id,
            payment_intent_id,
        } => {
            sqlx::query(
                r#"
                UPDATE payments
                SET status = $3, stripe_payment_id = $2, updated_at = NOW()
                WHERE appointment_id = $1 AND status = ANY($4)
                "#,
            )
            .bind(appointment_id.value())
            .bind(payment_intent_id)
            .bind(transition.target_status())
            .bind(sources(transition))
            .execute(&mut **tx)
            .await?
        }
        Transition::MarkPaymentFailed {
            appointment_id,
            payment_intent_id,
        } => {
            sqlx::query(
                r#"
                UPDATE payments
                SET status = $3, updated_at = NOW()
                WHERE appointment_id = $1 AND stripe_payment_id = $2 AND status = ANY($4)
                "#,
            )
            .bind(appointment_id.value())
            .bind(payment_intent_id)
            .bind(transition.target_status())
            .bind(sources(transition))
            .execute(&mut **tx)
            .await?
        }
        Transition::ActivateSubscription {
            user_id,
            session_id,
            subscription_id,
        } => {
            sqlx::query(
                r#"
                UPDATE subscriptions
                SET status = $4,
                    stripe_session_id = $2,
                    stripe_subscription_id = COALESCE($3, stripe_subscription_id),
                    updated_at = NOW()
                WHERE user_id = $1 AND status = ANY($5)
                "#,
            )
            .bind(user_id.as_str())
            .bind(session_id)
            .bind(subscription_id.as_deref())
            .bind(transition.target_status())
            .bind(sources(transition))
            .execute(&mut **tx)
            .await?
        }
        Transition::CancelSubscription {
            subscription_id,
            user_id,
        } => {
            // A deletion can overtake the completion that would have recorded
            // the subscription id, so fall back to the user for such rows.
            sqlx::query(
                r#"
                UPDATE subscriptions
                SET status = $3,
                    stripe_subscription_id = COALESCE(stripe_subscription_id, $1),
                    updated_at = NOW()
                WHERE status = ANY($4)
                  AND (stripe_subscription_id = $1
                       OR (stripe_subscription_id IS NULL AND user_id = $2))
                "#,
            )
            .bind(subscription_id)
            .bind(user_id.as_ref().map(SubjectId::as_str))
            .bind(transition.target_status())
            .bind(sources(transition))
            .execute(&mut **tx)
            .await?
        }
    };

    Ok(result.rows_affected())
}

/// Returns true if the record a transition targets exists at all.
async fn target_exists(
    tx: &mut Transaction<'_, Postgres>,
    transition: &Transition,
) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) = match transition {
        Transition::MarkPaymentPaid { appointment_id, .. }
        | Transition::MarkPaymentFailed { appointment_id, .. } => {
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM payments WHERE appointment_id = $1)")
                .bind(appointment_id.value())
                .fetch_one(&mut **tx)
                .await?
        }
        Transition::ActivateSubscription { user_id, .. } => {
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1)")
                .bind(user_id.as_str())
                .fetch_one(&mut **tx)
                .await?
        }
        Transition::CancelSubscription {
            subscription_id,
            user_id,
        } => {
            sqlx::query_as(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM subscriptions
                    WHERE stripe_subscription_id = $1 OR user_id = $2
                )
                "#,
            )
            .bind(subscription_id)
            .bind(user_id.as_ref().map(SubjectId::as_str))
            .fetch_one(&mut **tx)
            .await?
        }
    };

    Ok(exists)
}

#[async_trait]
impl SubscriptionReader for PostgresBillingStore {
    async fn subscription_status(
        &self,
        user_id: &SubjectId,
    ) -> Result<Option<SubscriptionStatus>, DomainError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM subscriptions WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to fetch subscription status", e))?;

        row.map(|(status,)| parse_subscription_status(&status))
            .transpose()
    }
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn apply(
        &self,
        event_id: &EventId,
        transition: &Transition,
    ) -> Result<ApplyOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        let claimed = sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, resource, processed_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id.as_str())
        .bind(transition.resource_key())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to record processed event", e))?
        .rows_affected();

        if claimed == 0 {
            tx.rollback()
                .await
                .map_err(|e| DomainError::database("Failed to roll back transaction", e))?;
            return Ok(ApplyOutcome::AlreadyProcessed);
        }

        let updated = update_conditionally(&mut tx, transition)
            .await
            .map_err(|e| DomainError::database("Failed to apply transition", e))?;

        let outcome = if updated > 0 {
            ApplyOutcome::Applied
        } else if target_exists(&mut tx, transition)
            .await
            .map_err(|e| DomainError::database("Failed to probe transition target", e))?
        {
            ApplyOutcome::Stale
        } else {
            ApplyOutcome::Unmatched
        };

        if outcome.is_recorded() {
            tx.commit()
                .await
                .map_err(|e| DomainError::database("Failed to commit transaction", e))?;
        } else {
            tx.rollback()
                .await
                .map_err(|e| DomainError::database("Failed to roll back transaction", e))?;
        }

        Ok(outcome)
    }

    async fn is_processed(&self, event_id: &EventId) -> Result<bool, DomainError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM processed_events WHERE event_id = $1)")
                .bind(event_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to check processed event", e))?;

        Ok(exists)
    }

    async fn upsert_pending_payment(
        &self,
        payment: &PendingPayment,
    ) -> Result<PaymentRecord, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            INSERT INTO payments (
                appointment_id, amount, currency, status, stripe_payment_id, created_at, updated_at
            ) VALUES ($1, $2, $3, 'pending', $4, NOW(), NOW())
            ON CONFLICT (appointment_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = 'pending',
                stripe_payment_id = EXCLUDED.stripe_payment_id,
                updated_at = NOW()
            WHERE payments.status <> 'paid'
            RETURNING appointment_id, amount, currency, status, stripe_payment_id,
                      created_at, updated_at
            "#,
        )
        .bind(payment.appointment_id.value())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.external_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save pending payment", e))?;

        match row {
            Some(row) => PaymentRecord::try_from(row),
            None => Err(DomainError::new(
                ErrorCode::PaymentAlreadyCompleted,
                format!(
                    "Appointment {} has already been paid",
                    payment.appointment_id
                ),
            )),
        }
    }

    async fn upsert_pending_subscription(
        &self,
        subscription: &PendingSubscription,
    ) -> Result<SubscriptionRecord, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            INSERT INTO subscriptions (
                user_id, stripe_session_id, stripe_subscription_id, plan_id, status,
                created_at, updated_at
            ) VALUES ($1, $2, NULL, $3, 'pending', NOW(), NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_session_id = EXCLUDED.stripe_session_id,
                stripe_subscription_id = NULL,
                plan_id = EXCLUDED.plan_id,
                status = 'pending',
                created_at = NOW(),
                updated_at = NOW()
            WHERE subscriptions.status <> 'active'
            RETURNING user_id, stripe_session_id, stripe_subscription_id, plan_id, status,
                      created_at, updated_at
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(&subscription.external_session_id)
        .bind(&subscription.plan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save pending subscription", e))?;

        match row {
            Some(row) => SubscriptionRecord::try_from(row),
            None => Err(DomainError::new(
                ErrorCode::SubscriptionAlreadyActive,
                "Subscription is already active",
            )),
        }
    }

    async fn find_payment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT appointment_id, amount, currency, status, stripe_payment_id,
                   created_at, updated_at
            FROM payments WHERE appointment_id = $1
            "#,
        )
        .bind(appointment_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch payment", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_subscription(
        &self,
        user_id: &SubjectId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT user_id, stripe_session_id, stripe_subscription_id, plan_id, status,
                   created_at, updated_at
            FROM subscriptions WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn provider_account(&self, provider_id: i64) -> Result<Option<String>, DomainError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT stripe_account_id FROM provider_accounts WHERE provider_id = $1",
        )
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch provider account", e))?;

        Ok(row.map(|(account,)| account))
    }

    async fn save_provider_account(
        &self,
        provider_id: i64,
        account_id: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO provider_accounts (provider_id, stripe_account_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (provider_id) DO UPDATE SET stripe_account_id = EXCLUDED.stripe_account_id
            "#,
        )
        .bind(provider_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save provider account", e))?;

        Ok(())
    }
}
