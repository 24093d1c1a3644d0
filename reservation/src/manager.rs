use abi::{DbConfig, Reservation, ReservationStatus, ScanFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;

use crate::{ReservationManager, ReservationStore};

#[async_trait]
impl ReservationStore for ReservationManager {
    async fn get(&self, id: &str) -> Result<Option<Reservation>, abi::Error> {
        let rsvp = sqlx::query_as(
            r#"SELECT id, room_number, check_in, check_out, guest_name, contact_email, "status", created_at, updated_at
            FROM rsvp.reservations WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rsvp)
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<Reservation>, abi::Error> {
        // status labels are not normalized in the table, so the status exclusion is applied
        // on the parsed rows
        let rows: Vec<Reservation> = sqlx::query_as(
            r#"SELECT id, room_number, check_in, check_out, guest_name, contact_email, "status", created_at, updated_at
            FROM rsvp.reservations
            WHERE ($1::text IS NULL OR room_number = $1) AND ($2::text IS NULL OR id <> $2)"#,
        )
        .bind(filter.room_number.as_deref())
        .bind(filter.exclude_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let scanned = rows.len();
        let rows: Vec<_> = rows.into_iter().filter(|r| filter.matches(r)).collect();
        debug!(scanned, matched = rows.len(), "reservation scan");
        Ok(rows)
    }

    async fn update_status(
        &self,
        id: &str,
        status: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Reservation, abi::Error> {
        let rsvp = sqlx::query_as(
            r#"UPDATE rsvp.reservations SET "status" = $1, updated_at = $2
            WHERE id = $3 AND lower("status") IN ('pending', 'pendiente')
            RETURNING id, room_number, check_in, check_out, guest_name, contact_email, "status", created_at, updated_at"#,
        )
        .bind(status.as_str())
        .bind(updated_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        rsvp.ok_or_else(|| abi::Error::UpdateRejected(id.to_string()))
    }
}

impl ReservationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_config(config: &DbConfig) -> Result<Self, abi::Error> {
        let pool = PgPoolOptions::default()
            .max_connections(config.max_connections)
            .connect(&config.url())
            .await?;
        Ok(Self::new(pool))
    }
}
