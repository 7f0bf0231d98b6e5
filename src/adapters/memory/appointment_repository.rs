//! In-memory implementation of AppointmentRepository.
//!
//! Used by tests and local runs without a database. Ordering and paging
//! match the PostgreSQL adapter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::appointment::{Appointment, AppointmentDraft, AppointmentFilter};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, Ownership, Timestamp};
use crate::ports::AppointmentRepository;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<AppointmentId, Appointment>,
    last_id: i64,
}

/// In-memory appointment store keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentRepository {
    table: RwLock<Table>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored appointments.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn not_found(id: AppointmentId) -> DomainError {
    DomainError::new(
        ErrorCode::AppointmentNotFound,
        format!("Appointment not found: {}", id),
    )
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, DomainError> {
        let table = self.table.read().await;
        let mut matching: Vec<Appointment> = table
            .rows
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.appointment_date
                .cmp(&a.appointment_date)
                .then(b.start_time.cmp(&a.start_time))
                .then(b.id.cmp(&a.id))
        });

        Ok(matching
            .into_iter()
            .skip(filter.page.offset as usize)
            .take(filter.page.limit as usize)
            .collect())
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, DomainError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_ownership(&self, id: AppointmentId) -> Result<Option<Ownership>, DomainError> {
        Ok(self.table.read().await.rows.get(&id).map(|a| Ownership {
            owner_id: a.owner_id,
            counterparty_id: a.counterparty_id,
        }))
    }

    async fn create(
        &self,
        owner_id: i64,
        draft: AppointmentDraft,
        created_at: Timestamp,
    ) -> Result<Appointment, DomainError> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = AppointmentId::new(table.last_id);
        let appointment = Appointment::from_draft(id, owner_id, draft, created_at);
        table.rows.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), DomainError> {
        let mut table = self.table.write().await;
        let stored = table
            .rows
            .get_mut(&appointment.id)
            .ok_or_else(|| not_found(appointment.id))?;

        // Owner and creation time stay as first stored.
        *stored = Appointment {
            owner_id: stored.owner_id,
            created_at: stored.created_at,
            ..appointment.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: AppointmentId) -> Result<(), DomainError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}
