//! Subscription record and its status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, SubjectId, Timestamp, ValidationError};

/// Status of a user's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Checkout session created, awaiting completion.
    Pending,

    /// Checkout completed and paid. Grants appointment creation.
    Active,

    /// Subscription deleted at the processor. Terminal for this term;
    /// only a fresh checkout starts a new one.
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Returns true if this status permits booking.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl StateMachine for SubscriptionStatus {
    fn all() -> &'static [Self] {
        &[
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::Canceled,
        ]
    }

    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active) | (Active, Canceled) | (Pending, Canceled)
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

/// A user's subscription. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub user_id: SubjectId,
    /// Checkout session that opened the current term (`cs_...`).
    pub external_session_id: String,
    /// Processor subscription id (`sub_...`), known once completed or deleted.
    pub external_subscription_id: Option<String>,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
