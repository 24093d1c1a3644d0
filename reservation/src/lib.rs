mod conflict;
mod manager;
mod memory;
mod normalizer;
mod reconcile;

use abi::{Reservation, ReservationStatus, ScanFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub use conflict::{available_rooms, find_conflicts};
pub use memory::InMemoryStore;
pub use normalizer::{Normalized, Normalizer};
pub use reconcile::{Reconciler, Reconciliation};

/// Postgres-backed reservation store.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    pool: PgPool,
}

/// The reservation store as seen by the reconciler. Rows are created and deleted by the
/// booking front end; the only write issued from here is the status update.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// get reservation by id
    async fn get(&self, id: &str) -> Result<Option<Reservation>, abi::Error>;
    /// scan every reservation, keeping the ones that match the filter
    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<Reservation>, abi::Error>;
    /// move a pending reservation to `status`. Rejected if the row is missing or no longer
    /// pending.
    async fn update_status(
        &self,
        id: &str,
        status: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Reservation, abi::Error>;
}
