//! Appointment aggregate.

use chrono::{NaiveDate, NaiveTime};

use crate::domain::foundation::{AppointmentId, OwnedByParties, Timestamp, ValidationError};

use super::AppointmentStatus;

/// A booked session between a customer (owner) and a provider (counterparty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub owner_id: i64,
    pub counterparty_id: i64,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub recurrence_rule: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The caller-editable part of an appointment.
///
/// Used for both creation and full replacement on update. Owner and
/// timestamps are never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub counterparty_id: i64,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub recurrence_rule: Option<String>,
}

impl AppointmentDraft {
    /// Validates field-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.counterparty_id <= 0 {
            return Err(ValidationError::out_of_range(
                "masseur_id",
                1,
                i64::MAX,
                self.counterparty_id,
            ));
        }
        if self.appointment_type.trim().is_empty() {
            return Err(ValidationError::empty_field("type"));
        }
        if self.end_time <= self.start_time {
            return Err(ValidationError::invalid_format(
                "end_time",
                "end time must be after start time",
            ));
        }
        Ok(())
    }
}

impl Appointment {
    /// Builds the stored form of a new appointment once the store has assigned an id.
    pub fn from_draft(
        id: AppointmentId,
        owner_id: i64,
        draft: AppointmentDraft,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner_id,
            counterparty_id: draft.counterparty_id,
            appointment_date: draft.appointment_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            appointment_type: draft.appointment_type,
            status: draft.status,
            description: draft.description,
            location: draft.location,
            recurrence_rule: draft.recurrence_rule,
            created_at,
            updated_at: created_at,
        }
    }

    /// Replaces the editable fields.
    ///
    /// `id`, `owner_id` and `created_at` are preserved; `updated_at` strictly advances.
    pub fn revise(self, draft: AppointmentDraft) -> Self {
        let updated_at = Timestamp::now_after(&self.updated_at);
        Self {
            counterparty_id: draft.counterparty_id,
            appointment_date: draft.appointment_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            appointment_type: draft.appointment_type,
            status: draft.status,
            description: draft.description,
            location: draft.location,
            recurrence_rule: draft.recurrence_rule,
            updated_at,
            ..self
        }
    }
}

impl OwnedByParties for Appointment {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn counterparty_id(&self) -> i64 {
        self.counterparty_id
    }
}

#[cfg(test)]
pub(crate) fn test_draft(counterparty_id: i64) -> AppointmentDraft {
    AppointmentDraft {
        counterparty_id,
        appointment_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        appointment_type: "deep-tissue".to_string(),
        status: AppointmentStatus::Upcoming,
        description: None,
        location: Some("Studio 2".to_string()),
        recurrence_rule: None,
    }
}
