use derive_builder::Builder;

use crate::{Reservation, ReservationId, ReservationStatus};

/// Predicate for a full-table scan of the reservation store.
///
/// There is no room/date index behind it: every implementation visits every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(default)]
pub struct ScanFilter {
    #[builder(setter(into, strip_option))]
    pub room_number: Option<String>,
    #[builder(setter(into, strip_option))]
    pub exclude_id: Option<ReservationId>,
    #[builder(setter(strip_option))]
    pub exclude_status: Option<ReservationStatus>,
}

impl ScanFilter {
    pub fn matches(&self, rsvp: &Reservation) -> bool {
        if let Some(room) = &self.room_number {
            if rsvp.room_number.as_ref() != Some(room) {
                return false;
            }
        }
        if self.exclude_id.as_ref() == Some(&rsvp.id) {
            return false;
        }
        // a record without a status is not excluded
        match self.exclude_status {
            Some(excluded) => rsvp.status != Some(excluded),
            None => true,
        }
    }
}
