use abi::{Error, Reservation, ReservationStatus};
use chrono::Utc;
use tracing::{debug, error, info};

use crate::{find_conflicts, ReservationStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not pending: nothing was read or written.
    Ineligible(Option<ReservationStatus>),
    Decided {
        status: ReservationStatus,
        conflicts: Vec<Reservation>,
        /// Whether the status write went through. A failed write does not undo the decision.
        persisted: bool,
    },
}

/// Moves a pending reservation to `Confirmed` or `Conflict`.
///
/// Only pending reservations are touched. The reconciler's own writes come back as change
/// notifications carrying `Confirmed`/`Conflict`, and must fall through as ineligible.
///
/// The conflict scan and the status write are separate store calls. Two overlapping
/// reservations reconciled at the same time can both see no conflict and both be confirmed.
pub struct Reconciler<'a> {
    store: &'a dyn ReservationStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn ReservationStore) -> Self {
        Self { store }
    }

    pub fn is_eligible(rsvp: &Reservation) -> bool {
        rsvp.is_pending()
    }

    pub async fn reconcile(&self, rsvp: &Reservation) -> Result<Reconciliation, Error> {
        if !Self::is_eligible(rsvp) {
            debug!(reservation_id = %rsvp.id, status = ?rsvp.status, "not pending, skipping");
            return Ok(Reconciliation::Ineligible(rsvp.status));
        }

        let conflicts = find_conflicts(self.store, rsvp).await?;
        let status = ReservationStatus::reconciled(conflicts.len());

        let persisted = match self.store.update_status(&rsvp.id, status, Utc::now()).await {
            Ok(_) => {
                info!(reservation_id = %rsvp.id, %status, "reservation status updated");
                true
            }
            Err(e) => {
                error!(reservation_id = %rsvp.id, %status, error = %e, "failed to persist reservation status");
                false
            }
        };

        Ok(Reconciliation::Decided {
            status,
            conflicts,
            persisted,
        })
    }
}
