//! Conditional state transitions applied by the billing store.
//!
//! A transition names its target row, the status it moves the row to, and
//! the statuses it may move it from. The store commits it only if the row
//! is still in one of those source states, which makes replays and
//! out-of-order deliveries converge.

use std::fmt;

use crate::domain::foundation::{AppointmentId, StateMachine, SubjectId};

use super::billing_event::BillingEvent;
use super::payment::PaymentStatus;
use super::subscription::SubscriptionStatus;

/// A single conditional mutation of a payment or subscription record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `{pending, failed} -> paid`, recording the succeeded intent.
    MarkPaymentPaid {
        appointment_id: AppointmentId,
        payment_intent_id: String,
    },

    /// `pending -> failed`, only for the record's current intent.
    MarkPaymentFailed {
        appointment_id: AppointmentId,
        payment_intent_id: String,
    },

    /// `pending -> active` keyed by user. Any paid session of the user
    /// activates; the paying session and subscription ids are recorded.
    ActivateSubscription {
        user_id: SubjectId,
        session_id: String,
        subscription_id: Option<String>,
    },

    /// `{pending, active} -> canceled`.
    CancelSubscription {
        subscription_id: String,
        user_id: Option<SubjectId>,
    },
}

impl Transition {
    /// Maps a decoded event to the transition it implies, if any.
    ///
    /// A checkout that completed without payment implies nothing.
    pub fn from_event(event: &BillingEvent) -> Option<Self> {
        match event {
            BillingEvent::PaymentSucceeded(outcome) => Some(Transition::MarkPaymentPaid {
                appointment_id: outcome.appointment_id,
                payment_intent_id: outcome.payment_intent_id.clone(),
            }),
            BillingEvent::PaymentFailed(outcome) => Some(Transition::MarkPaymentFailed {
                appointment_id: outcome.appointment_id,
                payment_intent_id: outcome.payment_intent_id.clone(),
            }),
            BillingEvent::CheckoutCompleted(completed) if completed.is_paid() => {
                Some(Transition::ActivateSubscription {
                    user_id: completed.user_id.clone(),
                    session_id: completed.session_id.clone(),
                    subscription_id: completed.subscription_id.clone(),
                })
            }
            BillingEvent::CheckoutCompleted(_) => None,
            BillingEvent::SubscriptionDeleted(deleted) => Some(Transition::CancelSubscription {
                subscription_id: deleted.subscription_id.clone(),
                user_id: deleted.user_id.clone(),
            }),
            BillingEvent::Unsupported(_) => None,
        }
    }

    /// Target status, as stored in the `status` column.
    pub fn target_status(&self) -> &'static str {
        match self {
            Transition::MarkPaymentPaid { .. } => PaymentStatus::Paid.as_str(),
            Transition::MarkPaymentFailed { .. } => PaymentStatus::Failed.as_str(),
            Transition::ActivateSubscription { .. } => SubscriptionStatus::Active.as_str(),
            Transition::CancelSubscription { .. } => SubscriptionStatus::Canceled.as_str(),
        }
    }

    /// Statuses the target row may be in for the transition to commit.
    pub fn expected_sources(&self) -> Vec<&'static str> {
        match self {
            Transition::MarkPaymentPaid { .. } => payment_sources(PaymentStatus::Paid),
            Transition::MarkPaymentFailed { .. } => payment_sources(PaymentStatus::Failed),
            Transition::ActivateSubscription { .. } => {
                subscription_sources(SubscriptionStatus::Active)
            }
            Transition::CancelSubscription { .. } => {
                subscription_sources(SubscriptionStatus::Canceled)
            }
        }
    }

    /// Returns true if the given payment status admits this transition.
    pub fn accepts_payment(&self, status: PaymentStatus) -> bool {
        match self {
            Transition::MarkPaymentPaid { .. } => status.can_transition_to(&PaymentStatus::Paid),
            Transition::MarkPaymentFailed { .. } => {
                status.can_transition_to(&PaymentStatus::Failed)
            }
            _ => false,
        }
    }

    /// Returns true if the given subscription status admits this transition.
    pub fn accepts_subscription(&self, status: SubscriptionStatus) -> bool {
        match self {
            Transition::ActivateSubscription { .. } => {
                status.can_transition_to(&SubscriptionStatus::Active)
            }
            Transition::CancelSubscription { .. } => {
                status.can_transition_to(&SubscriptionStatus::Canceled)
            }
            _ => false,
        }
    }

    /// Key of the record this transition targets, for logging.
    pub fn resource_key(&self) -> String {
        match self {
            Transition::MarkPaymentPaid { appointment_id, .. }
            | Transition::MarkPaymentFailed { appointment_id, .. } => {
                format!("appointment:{}", appointment_id)
            }
            Transition::ActivateSubscription { user_id, .. } => format!("user:{}", user_id),
            Transition::CancelSubscription {
                subscription_id, ..
            } => format!("subscription:{}", subscription_id),
        }
    }
}

fn payment_sources(target: PaymentStatus) -> Vec<&'static str> {
    PaymentStatus::sources_of(target)
        .into_iter()
        .map(|s| s.as_str())
        .collect()
}

fn subscription_sources(target: SubscriptionStatus) -> Vec<&'static str> {
    SubscriptionStatus::sources_of(target)
        .into_iter()
        .map(|s| s.as_str())
        .collect()
}

/// Result of applying one event's transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The row moved to the target status; the event id is recorded.
    Applied,

    /// The event id was already recorded; nothing was touched.
    AlreadyProcessed,

    /// The row exists but was not in a source state. Recorded, since it
    /// can never apply.
    Stale,

    /// No target row exists. Not recorded, so a redelivery can still
    /// apply once the checkout path has written the row.
    Unmatched,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::AlreadyProcessed => "already_processed",
            ApplyOutcome::Stale => "stale",
            ApplyOutcome::Unmatched => "unmatched",
        }
    }

    /// Returns true if the event id ends up in the processed-event log.
    pub fn is_recorded(&self) -> bool {
        !matches!(self, ApplyOutcome::Unmatched)
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
