//! HTTP DTOs for appointment endpoints.
//!
//! JSON bodies are camelCase. On input `masseurId` is accepted for the
//! counterparty; `clientId` is ignored since the owner always comes from
//! the authenticated principal.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::appointment::{
    Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus, Page,
};
use crate::domain::foundation::ValidationError;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /appointments` and `PUT /appointments/:id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    #[serde(alias = "masseurId")]
    pub counterparty_id: i64,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub appointment_type: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
}

impl From<AppointmentRequest> for AppointmentDraft {
    fn from(req: AppointmentRequest) -> Self {
        AppointmentDraft {
            counterparty_id: req.counterparty_id,
            appointment_date: req.appointment_date,
            start_time: req.start_time,
            end_time: req.end_time,
            appointment_type: req.appointment_type,
            status: req.status,
            description: req.description,
            location: req.location,
            recurrence_rule: req.recurrence_rule,
        }
    }
}

/// Query string of `GET /appointments`.
///
/// Everything arrives as text so that a bad `limit`/`offset` can fall back
/// to the default instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAppointmentsParams {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub masseur_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListAppointmentsParams {
    /// Builds the listing filter.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown status, a non-numeric party id,
    /// or a date that is not `YYYY-MM-DD`.
    pub fn into_filter(self) -> Result<AppointmentFilter, ValidationError> {
        Ok(AppointmentFilter {
            status: non_empty(self.status)
                .map(|s| s.parse::<AppointmentStatus>())
                .transpose()?,
            owner_id: parse_id("client_id", self.client_id)?,
            counterparty_id: parse_id("masseur_id", self.masseur_id)?,
            start_date: parse_date("start_date", self.start_date)?,
            end_date: parse_date("end_date", self.end_date)?,
            page: Page::new(lenient_int(self.limit), lenient_int(self.offset)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn lenient_int(value: Option<String>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_id(field: &str, value: Option<String>) -> Result<Option<i64>, ValidationError> {
    non_empty(value)
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::invalid_format(field, "must be an integer"))
        })
        .transpose()
}

fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
    non_empty(value)
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map_err(|_| ValidationError::invalid_format(field, "expected YYYY-MM-DD"))
        })
        .transpose()
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// An appointment as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: i64,
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
    /// ISO 8601.
    pub created_at: String,
    /// ISO 8601.
    pub updated_at: String,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id.value(),
            owner_id: a.owner_id,
            counterparty_id: a.counterparty_id,
            appointment_date: a.appointment_date,
            start_time: a.start_time,
            end_time: a.end_time,
            appointment_type: a.appointment_type,
            status: a.status,
            description: a.description,
            location: a.location,
            recurrence_rule: a.recurrence_rule,
            created_at: a.created_at.as_datetime().to_rfc3339(),
            updated_at: a.updated_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Confirmation body for deletes.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::appointment::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

    fn params(pairs: &[(&str, &str)]) -> ListAppointmentsParams {
        let object = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object)).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Parsing
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn request_accepts_masseur_alias_and_defaults_status() {
        let req: AppointmentRequest = serde_json::from_value(serde_json::json!({
            "clientId": 99,
            "masseurId": 30,
            "appointmentDate": "2025-03-14",
            "startTime": "10:00:00",
            "endTime": "11:00:00",
            "appointmentType": "swedish"
        }))
        .unwrap();

        let draft = AppointmentDraft::from(req);
        assert_eq!(draft.counterparty_id, 30);
        assert_eq!(draft.status, AppointmentStatus::Pending);
        assert_eq!(draft.location, None);
    }

    #[test]
    fn request_accepts_camel_case_counterparty() {
        let req: AppointmentRequest = serde_json::from_value(serde_json::json!({
            "counterpartyId": 31,
            "appointmentDate": "2025-03-14",
            "startTime": "10:00:00",
            "endTime": "11:00:00",
            "appointmentType": "swedish",
            "status": "upcoming"
        }))
        .unwrap();

        assert_eq!(req.counterparty_id, 31);
        assert_eq!(req.status, AppointmentStatus::Upcoming);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // List Parameters
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn bad_paging_values_fall_back_to_defaults() {
        let filter = params(&[("limit", "abc"), ("offset", "-4")])
            .into_filter()
            .unwrap();
        assert_eq!(filter.page, Page { limit: DEFAULT_PAGE_SIZE, offset: 0 });

        let filter = params(&[("limit", "100000")]).into_filter().unwrap();
        assert_eq!(filter.page.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn filters_are_parsed() {
        let filter = params(&[
            ("status", "completed"),
            ("client_id", "7"),
            ("masseur_id", "30"),
            ("start_date", "2025-01-01"),
            ("end_date", "2025-01-31"),
        ])
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, Some(AppointmentStatus::Completed));
        assert_eq!(filter.owner_id, Some(7));
        assert_eq!(filter.counterparty_id, Some(30));
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.end_date, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn empty_values_are_no_filter() {
        let filter = params(&[("status", ""), ("client_id", " ")])
            .into_filter()
            .unwrap();
        assert_eq!(filter, AppointmentFilter::default());
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!(params(&[("status", "archived")]).into_filter().is_err());
        assert!(params(&[("client_id", "seven")]).into_filter().is_err());
        assert!(params(&[("start_date", "14/03/2025")]).into_filter().is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response Serialization
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn response_is_camel_case() {
        use crate::domain::appointment::test_draft;
        use crate::domain::foundation::{AppointmentId, Timestamp};

        let appointment =
            Appointment::from_draft(AppointmentId::new(5), 7, test_draft(30), Timestamp::now());
        let json = serde_json::to_value(AppointmentResponse::from(appointment)).unwrap();

        assert_eq!(json["id"], 5);
        assert_eq!(json["ownerId"], 7);
        assert_eq!(json["counterpartyId"], 30);
        assert_eq!(json["appointmentDate"], "2025-03-14");
        assert_eq!(json["status"], "upcoming");
    }
}
