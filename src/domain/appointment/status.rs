//! Appointment lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Status of a booked appointment.
///
/// Unlike billing records, appointment status is edited freely by the
/// parties; no transition rules are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Upcoming,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Upcoming => "upcoming",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "upcoming" => Ok(AppointmentStatus::Upcoming),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown appointment status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Upcoming".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Upcoming);
        assert_eq!("canceled".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::Cancelled);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("archived".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn defaults_to_pending() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Pending);
    }
}
