use std::collections::HashSet;

use abi::{DateRange, Error, Reservation, ReservationStatus, ScanFilterBuilder};
use tracing::{info, warn};

use crate::ReservationStore;

/// Other active reservations on the candidate's room whose stay overlaps the candidate's.
///
/// Retrieval is a full scan of the store filtered by room, id and status: there is no
/// room/date index to narrow it. The order of the result is whatever the scan produced.
pub async fn find_conflicts(
    store: &dyn ReservationStore,
    candidate: &Reservation,
) -> Result<Vec<Reservation>, Error> {
    let stay = candidate.get_stay()?;
    let room = candidate
        .room_number
        .as_deref()
        .ok_or_else(|| Error::MissingFields(vec!["RoomNumber"]))?;

    let filter = ScanFilterBuilder::default()
        .room_number(room)
        .exclude_id(candidate.id.as_str())
        .exclude_status(ReservationStatus::Cancelled)
        .build()
        .map_err(|e| Error::Unexpected(e.to_string()))?;

    let peers = store.scan(&filter).await?;
    let scanned = peers.len();
    let conflicts: Vec<_> = peers
        .into_iter()
        .filter(|peer| match peer.get_stay() {
            Ok(peer_stay) => peer_stay.overlaps(&stay),
            Err(e) => {
                warn!(reservation_id = %peer.id, error = %e, "skipping reservation with unusable stay");
                false
            }
        })
        .collect();

    info!(
        reservation_id = %candidate.id,
        room,
        scanned,
        conflicts = conflicts.len(),
        "conflict scan finished"
    );
    Ok(conflicts)
}

/// Rooms out of `rooms` that no active reservation occupies during `stay`.
///
/// Uses the same overlap rule as reconciliation so the front end never offers a room the
/// reconciler would then flag.
pub async fn available_rooms(
    store: &dyn ReservationStore,
    rooms: &[String],
    stay: &DateRange,
) -> Result<Vec<String>, Error> {
    let filter = ScanFilterBuilder::default()
        .exclude_status(ReservationStatus::Cancelled)
        .build()
        .map_err(|e| Error::Unexpected(e.to_string()))?;

    let occupied: HashSet<String> = store
        .scan(&filter)
        .await?
        .into_iter()
        .filter(|rsvp| rsvp.get_stay().map_or(false, |s| s.overlaps(stay)))
        .filter_map(|rsvp| rsvp.room_number)
        .collect();

    Ok(rooms
        .iter()
        .filter(|room| !occupied.contains(*room))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    fn booking(id: &str, room: &str, check_in: &str, check_out: &str) -> Reservation {
        Reservation::new_pending(id, room, check_in, check_out, "Guest", "guest@example.com")
    }

    fn ids(rsvps: &[Reservation]) -> HashSet<&str> {
        rsvps.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn overlapping_reservation_on_same_room_should_conflict() {
        let store = InMemoryStore::with_reservations([
            booking("existing", "101", "2024-06-01", "2024-06-05")
                .with_status(ReservationStatus::Confirmed),
            booking("other-room", "102", "2024-06-01", "2024-06-05"),
            booking("later", "101", "2024-06-10", "2024-06-12"),
        ]);
        let candidate = booking("new", "101", "2024-06-03", "2024-06-07");
        store.insert(candidate.clone()).await;

        let conflicts = find_conflicts(&store, &candidate).await.unwrap();
        assert_eq!(ids(&conflicts), HashSet::from(["existing"]));
    }

    #[tokio::test]
    async fn adjacent_reservation_should_not_conflict() {
        let store = InMemoryStore::with_reservations([booking("existing", "101", "2024-06-01", "2024-06-05")
            .with_status(ReservationStatus::Confirmed)]);
        let candidate = booking("new", "101", "2024-06-05", "2024-06-08");

        assert!(find_conflicts(&store, &candidate).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_reservation_should_never_conflict() {
        let store = InMemoryStore::with_reservations([
            booking("cancelled", "101", "2024-06-01", "2024-06-10")
                .with_status(ReservationStatus::Cancelled),
            booking("pending", "101", "2024-06-02", "2024-06-03"),
            booking("conflict", "101", "2024-06-04", "2024-06-06")
                .with_status(ReservationStatus::Conflict),
        ]);
        let candidate = booking("new", "101", "2024-06-01", "2024-06-08");

        let conflicts = find_conflicts(&store, &candidate).await.unwrap();
        assert_eq!(ids(&conflicts), HashSet::from(["pending", "conflict"]));
    }

    #[tokio::test]
    async fn peers_with_broken_dates_should_be_skipped() {
        let mut broken = booking("broken", "101", "2024-06-01", "someday");
        broken.status = Some(ReservationStatus::Confirmed);
        let store = InMemoryStore::with_reservations([broken]);
        let candidate = booking("new", "101", "2024-06-01", "2024-06-08");

        assert!(find_conflicts(&store, &candidate).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scan_failure_should_propagate() {
        let store = InMemoryStore::new();
        store.fail_scans(true);
        let candidate = booking("new", "101", "2024-06-01", "2024-06-08");
        assert!(matches!(
            find_conflicts(&store, &candidate).await,
            Err(Error::DbError(_))
        ));
    }

    #[tokio::test]
    async fn available_rooms_should_use_same_overlap_rule() {
        let store = InMemoryStore::with_reservations([
            booking("a", "101", "2024-06-01", "2024-06-05").with_status(ReservationStatus::Confirmed),
            booking("b", "102", "2024-06-05", "2024-06-08"),
            booking("c", "201", "2024-06-03", "2024-06-04").with_status(ReservationStatus::Cancelled),
            booking("d", "202", "2024-06-04", "2024-06-06").with_status(ReservationStatus::Conflict),
        ]);
        let rooms: Vec<String> = ["101", "102", "201", "202", "301"].map(String::from).to_vec();
        let stay = DateRange::parse("2024-06-03", "2024-06-05").unwrap();

        let free = available_rooms(&store, &rooms, &stay).await.unwrap();
        assert_eq!(free, vec!["102", "201", "301"]);
    }
}
