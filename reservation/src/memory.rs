use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use abi::{Reservation, ReservationStatus, ScanFilter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::ReservationStore;

/// Reservation store kept in memory, in insertion order.
///
/// Used for tests and local runs. Failures can be switched on to exercise the error paths of
/// the reconciler.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: RwLock<Vec<Reservation>>,
    status_writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_scans: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservations(rows: impl IntoIterator<Item = Reservation>) -> Self {
        Self {
            rows: RwLock::new(rows.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Put semantics: an existing row with the same id is replaced.
    pub async fn insert(&self, rsvp: Reservation) {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == rsvp.id) {
            Some(row) => *row = rsvp,
            None => rows.push(rsvp),
        }
    }

    pub async fn snapshot(&self) -> Vec<Reservation> {
        self.rows.read().await.clone()
    }

    /// Number of status updates applied so far.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Reservation>, abi::Error> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<Reservation>, abi::Error> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(abi::Error::DbError(sqlx::Error::PoolClosed));
        }
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Reservation, abi::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(abi::Error::DbError(sqlx::Error::PoolTimedOut));
        }
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id && r.is_pending())
            .ok_or_else(|| abi::Error::UpdateRejected(id.to_string()))?;
        row.status = Some(status);
        row.updated_at = Some(updated_at);
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(row.clone())
    }
}
