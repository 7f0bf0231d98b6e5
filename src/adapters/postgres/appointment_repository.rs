//! PostgreSQL implementation of AppointmentRepository.
//!
//! The customer and provider columns keep their historical names
//! (`client_id`, `masseur_id`).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;

use crate::domain::appointment::{Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, Ownership, Timestamp};
use crate::ports::AppointmentRepository;

const SELECT_COLUMNS: &str = r#"
    SELECT id, client_id, masseur_id, appointment_date, start_time, end_time,
           type, status, description, location, recurrence_rule, created_at, updated_at
    FROM appointments
"#;

/// PostgreSQL implementation of the AppointmentRepository port.
#[derive(Clone)]
pub struct PostgresAppointmentRepository {
    pool: PgPool,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an appointment.
#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: i64,
    client_id: i64,
    masseur_id: i64,
    appointment_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    #[sqlx(rename = "type")]
    appointment_type: String,
    status: String,
    description: Option<String>,
    location: Option<String>,
    recurrence_rule: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DomainError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AppointmentStatus>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", e))
        })?;

        Ok(Appointment {
            id: AppointmentId::new(row.id),
            owner_id: row.client_id,
            counterparty_id: row.masseur_id,
            appointment_date: row.appointment_date,
            start_time: row.start_time,
            end_time: row.end_time,
            appointment_type: row.appointment_type,
            status,
            description: row.description,
            location: row.location,
            recurrence_rule: row.recurrence_rule,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn not_found(id: AppointmentId) -> DomainError {
    DomainError::new(
        ErrorCode::AppointmentNotFound,
        format!("Appointment not found: {}", id),
    )
}

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DomainError> {
        let query = format!(
            r#"{}
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR client_id = $2)
              AND ($3::BIGINT IS NULL OR masseur_id = $3)
              AND ($4::DATE IS NULL OR appointment_date >= $4)
              AND ($5::DATE IS NULL OR appointment_date <= $5)
            ORDER BY appointment_date DESC, start_time DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
            SELECT_COLUMNS
        );

        let rows: Vec<AppointmentRow> = sqlx::query_as(&query)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.owner_id)
            .bind(filter.counterparty_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.page.limit)
            .bind(filter.page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list appointments", e))?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, DomainError> {
        let query = format!("{} WHERE id = $1", SELECT_COLUMNS);

        let row: Option<AppointmentRow> = sqlx::query_as(&query)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch appointment", e))?;

        row.map(Appointment::try_from).transpose()
    }

    async fn find_ownership(&self, id: AppointmentId) -> Result<Option<Ownership>, DomainError> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT client_id, masseur_id FROM appointments WHERE id = $1")
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to fetch appointment owner", e))?;

        Ok(row.map(|(owner_id, counterparty_id)| Ownership {
            owner_id,
            counterparty_id,
        }))
    }

    async fn create(
        &self,
        owner_id: i64,
        draft: AppointmentDraft,
        created_at: Timestamp,
    ) -> Result<Appointment, DomainError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO appointments (
                client_id, masseur_id, appointment_date, start_time, end_time, type,
                status, description, location, recurrence_rule, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(draft.counterparty_id)
        .bind(draft.appointment_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.appointment_type)
        .bind(draft.status.as_str())
        .bind(&draft.description)
        .bind(&draft.location)
        .bind(&draft.recurrence_rule)
        .bind(created_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert appointment", e))?;

        Ok(Appointment::from_draft(
            AppointmentId::new(id),
            owner_id,
            draft,
            created_at,
        ))
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), DomainError> {
        // client_id and created_at are deliberately absent from the SET list.
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                masseur_id = $2,
                appointment_date = $3,
                start_time = $4,
                end_time = $5,
                type = $6,
                status = $7,
                description = $8,
                location = $9,
                recurrence_rule = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(appointment.id.value())
        .bind(appointment.counterparty_id)
        .bind(appointment.appointment_date)
        .bind(appointment.start_time)
        .bind(appointment.end_time)
        .bind(&appointment.appointment_type)
        .bind(appointment.status.as_str())
        .bind(&appointment.description)
        .bind(&appointment.location)
        .bind(&appointment.recurrence_rule)
        .bind(appointment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update appointment", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(appointment.id));
        }

        Ok(())
    }

    async fn delete(&self, id: AppointmentId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete appointment", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> AppointmentRow {
        let now = Utc::now();
        AppointmentRow {
            id: 3,
            client_id: 7,
            masseur_id: 30,
            appointment_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            appointment_type: "swedish".to_string(),
            status: status.to_string(),
            description: None,
            location: Some("Studio B".to_string()),
            recurrence_rule: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_maps_client_and_masseur_columns() {
        let appointment = Appointment::try_from(row("upcoming")).unwrap();
        assert_eq!(appointment.id, AppointmentId::new(3));
        assert_eq!(appointment.owner_id, 7);
        assert_eq!(appointment.counterparty_id, 30);
        assert_eq!(appointment.status, AppointmentStatus::Upcoming);
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        let err = Appointment::try_from(row("archived")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn create_then_find_round_trips_through_postgres() {
        let pool = PgPool::connect(&std::env::var("DATABASE_URL").unwrap())
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let repo = PostgresAppointmentRepository::new(pool);

        let created = repo
            .create(7, crate::domain::appointment::test_draft(30), Timestamp::now())
            .await
            .unwrap();
        let ownership = repo.find_ownership(created.id).await.unwrap().unwrap();
        assert_eq!(ownership.owner_id, 7);
        repo.delete(created.id).await.unwrap();
        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
    }
}
