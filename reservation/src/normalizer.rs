use abi::{
    AttributeValue, ChangeFeedRecord, Error, EventEnvelope, LogOperation, OperationLogEvent,
    Reservation, RESERVATION_ID_ATTR,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::ReservationStore;

/// What a raw event turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Reservation(Reservation),
    /// An event name this reconciler does not act on.
    Unsupported(String),
}

/// Turns raw envelopes into reservations.
///
/// Operation-log events only reference the written item, so the current row is always read
/// back from the store. That holds for batch writes too, even though they carry the item:
/// the log can lag behind the table.
pub struct Normalizer<'a> {
    store: &'a dyn ReservationStore,
    source_table: Option<&'a str>,
}

impl<'a> Normalizer<'a> {
    pub fn new(store: &'a dyn ReservationStore) -> Self {
        Self {
            store,
            source_table: None,
        }
    }

    pub fn with_source_table(mut self, table: Option<&'a str>) -> Self {
        self.source_table = table;
        self
    }

    pub async fn normalize(&self, raw: &Value) -> Result<Normalized, Error> {
        match EventEnvelope::parse(raw)? {
            EventEnvelope::OperationLog(event) => self.from_operation_log(&event).await,
            EventEnvelope::ChangeFeed(record) => from_change_feed(&record),
        }
    }

    async fn from_operation_log(&self, event: &OperationLogEvent) -> Result<Normalized, Error> {
        let Some(operation) = event.operation() else {
            warn!(event_name = %event.event_name, "unsupported operation-log event");
            return Ok(Normalized::Unsupported(event.event_name.clone()));
        };

        let params = &event.request_parameters;
        let id = match operation {
            LogOperation::PutItem | LogOperation::UpdateItem => key_id(params),
            LogOperation::BatchWriteItem => self.batch_item_id(params),
        }
        .map_err(|e| {
            warn!(event_name = %event.event_name, structure = %params, error = %e, "cannot extract reservation id");
            e
        })?;

        info!(event_name = %event.event_name, reservation_id = %id, "fetching reservation");
        match self.store.get(&id).await? {
            Some(rsvp) => Ok(Normalized::Reservation(rsvp)),
            None => {
                warn!(reservation_id = %id, "reservation referenced by event does not exist");
                Err(Error::NotFound(id))
            }
        }
    }

    /// Only the first request of the table's list is looked at.
    fn batch_item_id(&self, params: &Value) -> Result<String, Error> {
        let tables = params
            .get("requestItems")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::MalformedEvent("requestParameters has no requestItems".into()))?;

        let requests = match self.source_table {
            Some(table) => tables.get(table).ok_or_else(|| {
                Error::MalformedEvent(format!("requestItems has no entry for table {table}"))
            })?,
            None => tables
                .values()
                .next()
                .ok_or_else(|| Error::MalformedEvent("requestItems is empty".into()))?,
        };

        let item = requests
            .as_array()
            .and_then(|requests| requests.first())
            .and_then(|first| first.pointer("/putRequest/item"))
            .ok_or_else(|| {
                Error::MalformedEvent("first request is not a putRequest with an item".into())
            })?;

        item.get(RESERVATION_ID_ATTR)
            .and_then(resolve_id)
            .ok_or_else(|| {
                Error::MalformedEvent(format!("no usable {RESERVATION_ID_ATTR} in put item"))
            })
    }
}

fn from_change_feed(record: &ChangeFeedRecord) -> Result<Normalized, Error> {
    if record.change().is_none() {
        warn!(event_name = %record.event_name, "unsupported change-feed event");
        return Ok(Normalized::Unsupported(record.event_name.clone()));
    }
    let image = record.new_image().ok_or_else(|| {
        warn!(event_name = %record.event_name, record = ?record.dynamodb, "change-feed record without NewImage");
        Error::MalformedEvent("change-feed record carries no NewImage".into())
    })?;
    let item = AttributeValue::decode_item(image);
    Reservation::from_attributes(&item).map(Normalized::Reservation)
}

fn key_id(params: &Value) -> Result<String, Error> {
    let key = params
        .get("key")
        .ok_or_else(|| Error::MalformedEvent("requestParameters has no key".into()))?;
    key.get(RESERVATION_ID_ATTR)
        .and_then(resolve_id)
        .ok_or_else(|| Error::MalformedEvent(format!("no usable {RESERVATION_ID_ATTR} in key")))
}

/// An id is either a bare string or a string tagged as `{"S": "..."}`.
fn resolve_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(id) => id.as_str(),
        Value::Object(tagged) => tagged.get("S")?.as_str()?,
        _ => return None,
    };
    (!id.trim().is_empty()).then(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use abi::ReservationStatus;
    use serde_json::json;

    fn store() -> InMemoryStore {
        InMemoryStore::with_reservations([
            Reservation::new_pending("r-1", "101", "2024-06-01", "2024-06-05", "Ana", "ana@x.io"),
            Reservation::new_pending("r-2", "102", "2024-06-01", "2024-06-05", "Ben", "ben@x.io")
                .with_status(ReservationStatus::Confirmed),
        ])
    }

    fn normalized_id(result: Normalized) -> String {
        match result {
            Normalized::Reservation(rsvp) => rsvp.id,
            other => panic!("expected a reservation, got {other:?}"),
        }
    }

    #[test]
    fn resolve_id_should_accept_bare_and_tagged() {
        assert_eq!(resolve_id(&json!("r-1")).as_deref(), Some("r-1"));
        assert_eq!(resolve_id(&json!({"S": "r-1"})).as_deref(), Some("r-1"));
        assert_eq!(resolve_id(&json!({"N": "1"})), None);
        assert_eq!(resolve_id(&json!("")), None);
        assert_eq!(resolve_id(&json!(42)), None);
    }

    #[tokio::test]
    async fn put_and_update_items_should_be_fetched_from_store() {
        let store = store();
        let normalizer = Normalizer::new(&store);

        let put = json!({"detail": {"eventName": "PutItem", "requestParameters": {"key": {"ReservationID": {"S": "r-1"}}}}});
        assert_eq!(normalized_id(normalizer.normalize(&put).await.unwrap()), "r-1");

        let update = json!({"detail": {"eventName": "UpdateItem", "requestParameters": {"key": {"ReservationID": "r-2"}}}});
        let Normalized::Reservation(rsvp) = normalizer.normalize(&update).await.unwrap() else {
            panic!("expected a reservation");
        };
        // the stored row wins over whatever the event says
        assert_eq!(rsvp.status, Some(ReservationStatus::Confirmed));
    }

    #[tokio::test]
    async fn batch_write_should_use_first_item_of_table() {
        let store = store();
        let event = json!({"detail": {"eventName": "BatchWriteItem", "requestParameters": {"requestItems": {
            "Audit": [{"putRequest": {"item": {"ReservationID": "r-2"}}}],
            "HotelReservations": [
                {"putRequest": {"item": {"ReservationID": {"S": "r-1"}, "Status": {"S": "Confirmed"}}}},
                {"putRequest": {"item": {"ReservationID": {"S": "r-2"}}}}
            ]
        }}}});

        let first_table = Normalizer::new(&store);
        assert_eq!(normalized_id(first_table.normalize(&event).await.unwrap()), "r-2");

        let configured = Normalizer::new(&store).with_source_table(Some("HotelReservations"));
        let Normalized::Reservation(rsvp) = configured.normalize(&event).await.unwrap() else {
            panic!("expected a reservation");
        };
        assert_eq!(rsvp.id, "r-1");
        assert!(rsvp.is_pending());

        let missing = Normalizer::new(&store).with_source_table(Some("Rooms"));
        assert!(matches!(
            missing.normalize(&event).await,
            Err(Error::MalformedEvent(_))
        ));
    }

    #[tokio::test]
    async fn malformed_operation_log_events_should_fail_extraction() {
        let store = store();
        let normalizer = Normalizer::new(&store);
        let events = [
            json!({"detail": {"eventName": "PutItem", "requestParameters": {}}}),
            json!({"detail": {"eventName": "PutItem", "requestParameters": {"key": {"Id": "r-1"}}}}),
            json!({"detail": {"eventName": "UpdateItem", "requestParameters": {"key": {"ReservationID": {"S": ""}}}}}),
            json!({"detail": {"eventName": "BatchWriteItem", "requestParameters": {"requestItems": {"T": [{"deleteRequest": {}}]}}}}),
            json!({"detail": {"eventName": "BatchWriteItem", "requestParameters": {"requestItems": {}}}}),
        ];
        for event in events {
            assert!(
                matches!(normalizer.normalize(&event).await, Err(Error::MalformedEvent(_))),
                "{event} should be malformed"
            );
        }
    }

    #[tokio::test]
    async fn unknown_id_should_be_not_found() {
        let store = store();
        let event = json!({"detail": {"eventName": "PutItem", "requestParameters": {"key": {"ReservationID": "ghost"}}}});
        assert_eq!(
            Normalizer::new(&store).normalize(&event).await.unwrap_err(),
            Error::NotFound("ghost".into())
        );
    }

    #[tokio::test]
    async fn unsupported_event_names_should_be_skipped() {
        let store = store();
        let normalizer = Normalizer::new(&store);
        let delete = json!({"detail": {"eventName": "DeleteItem", "requestParameters": {"key": {"ReservationID": "r-1"}}}});
        assert_eq!(
            normalizer.normalize(&delete).await.unwrap(),
            Normalized::Unsupported("DeleteItem".into())
        );
        let remove = json!({"eventName": "REMOVE", "dynamodb": {"OldImage": {}}});
        assert_eq!(
            normalizer.normalize(&remove).await.unwrap(),
            Normalized::Unsupported("REMOVE".into())
        );
    }

    #[tokio::test]
    async fn change_feed_image_should_be_decoded_without_lookup() {
        let store = InMemoryStore::new();
        let record = json!({"eventName": "INSERT", "dynamodb": {"NewImage": {
            "ReservationID": {"S": "r-9"},
            "RoomNumber": {"S": "301"},
            "CheckInDate": {"S": "2024-07-01"},
            "CheckOutDate": {"S": "2024-07-03"},
            "Status": {"S": "Pending"}
        }}});
        let Normalized::Reservation(rsvp) = Normalizer::new(&store).normalize(&record).await.unwrap() else {
            panic!("expected a reservation");
        };
        assert_eq!(rsvp.id, "r-9");
        assert_eq!(rsvp.room_number.as_deref(), Some("301"));
        assert!(rsvp.is_pending());

        let no_image = json!({"eventName": "MODIFY", "dynamodb": {}});
        assert!(matches!(
            Normalizer::new(&store).normalize(&no_image).await,
            Err(Error::MalformedEvent(_))
        ));
    }
}
