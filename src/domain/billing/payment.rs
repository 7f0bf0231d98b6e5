//! Payment record and its status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{AppointmentId, StateMachine, Timestamp, ValidationError};

/// Status of the payment for one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout intent created, no confirmation from the processor yet.
    Pending,

    /// Processor confirmed the charge. Terminal.
    Paid,

    /// Processor reported a failed attempt. The customer may retry the
    /// same intent, so a later success is still accepted.
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn all() -> &'static [Self] {
        &[PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Failed]
    }

    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Failed, Paid)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown value '{}'", other),
            )),
        }
    }
}

/// Payment for an appointment. At most one per appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub appointment_id: AppointmentId,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Processor payment intent id (`pi_...`).
    pub external_payment_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
