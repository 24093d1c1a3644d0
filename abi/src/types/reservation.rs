use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use tracing::warn;

use crate::{parse_timestamp, AttributeValue, DateRange, Error, ReservationId, ReservationStatus};

pub const RESERVATION_ID_ATTR: &str = "ReservationID";
const ROOM_NUMBER_ATTR: &str = "RoomNumber";
const CHECK_IN_ATTR: &str = "CheckInDate";
const CHECK_OUT_ATTR: &str = "CheckOutDate";
const GUEST_NAME_ATTR: &str = "GuestName";
const CONTACT_EMAIL_ATTR: &str = "ContactEmail";
const STATUS_ATTR: &str = "Status";
const CREATED_AT_ATTR: &str = "CreatedAt";
const UPDATED_AT_ATTR: &str = "UpdatedAt";

/// A booking as read from the reservation store.
///
/// Everything except the id may be absent: the store is written by the booking front end and
/// records are only checked when they are about to be reconciled (see [`Reservation::validate`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub room_number: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub guest_name: Option<String>,
    pub contact_email: Option<String>,
    pub status: Option<ReservationStatus>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn new_pending(
        id: impl Into<String>,
        room_number: impl Into<String>,
        check_in: impl Into<String>,
        check_out: impl Into<String>,
        guest_name: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            room_number: Some(room_number.into()),
            check_in: Some(check_in.into()),
            check_out: Some(check_out.into()),
            guest_name: Some(guest_name.into()),
            contact_email: Some(contact_email.into()),
            status: Some(ReservationStatus::Pending),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn with_status(mut self, status: ReservationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(ReservationStatus::Pending)
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            (ROOM_NUMBER_ATTR, &self.room_number),
            (CHECK_IN_ATTR, &self.check_in),
            (CHECK_OUT_ATTR, &self.check_out),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// Required fields are present and the stay is a well-formed date range.
    pub fn validate(&self) -> Result<(), Error> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }
        self.get_stay().map(|_| ())
    }

    pub fn get_stay(&self) -> Result<DateRange, Error> {
        match (self.check_in.as_deref(), self.check_out.as_deref()) {
            (Some(check_in), Some(check_out)) => DateRange::parse(check_in, check_out),
            (None, None) => Err(Error::MissingFields(vec![CHECK_IN_ATTR, CHECK_OUT_ATTR])),
            (None, _) => Err(Error::MissingFields(vec![CHECK_IN_ATTR])),
            (_, None) => Err(Error::MissingFields(vec![CHECK_OUT_ATTR])),
        }
    }

    /// Build a reservation from a decoded change-feed image.
    pub fn from_attributes(item: &BTreeMap<String, AttributeValue>) -> Result<Self, Error> {
        let text = |name: &str| item.get(name).and_then(AttributeValue::as_text);

        let id = text(RESERVATION_ID_ATTR)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::MalformedEvent(format!("image carries no {RESERVATION_ID_ATTR}"))
            })?;

        let status = text(STATUS_ATTR).and_then(|raw| match raw.parse::<ReservationStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(reservation_id = %id, error = %e, "ignoring unknown status");
                None
            }
        });

        Ok(Self {
            room_number: text(ROOM_NUMBER_ATTR),
            check_in: text(CHECK_IN_ATTR),
            check_out: text(CHECK_OUT_ATTR),
            guest_name: text(GUEST_NAME_ATTR),
            contact_email: text(CONTACT_EMAIL_ATTR),
            status,
            created_at: text(CREATED_AT_ATTR).and_then(|ts| parse_timestamp(&ts)),
            updated_at: text(UPDATED_AT_ATTR).and_then(|ts| parse_timestamp(&ts)),
            id,
        })
    }
}

impl FromRow<'_, PgRow> for Reservation {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let status: Option<String> = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            room_number: row.try_get("room_number")?,
            check_in: row.try_get("check_in")?,
            check_out: row.try_get("check_out")?,
            guest_name: row.try_get("guest_name")?,
            contact_email: row.try_get("contact_email")?,
            status: status.and_then(|s| s.parse().ok()),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_should_report_missing_fields() {
        let mut rsvp = Reservation::new_pending("r1", "101", "2024-06-01", "2024-06-05", "Ana", "ana@example.com");
        assert!(rsvp.validate().is_ok());

        rsvp.room_number = Some("  ".into());
        rsvp.check_out = None;
        assert_eq!(
            rsvp.validate().unwrap_err(),
            Error::MissingFields(vec!["RoomNumber", "CheckOutDate"])
        );
    }

    #[test]
    fn validate_should_reject_inverted_stay() {
        let rsvp = Reservation::new_pending("r1", "101", "2024-06-05", "2024-06-01", "Ana", "ana@example.com");
        assert!(matches!(rsvp.validate(), Err(Error::InvalidDateRange { .. })));
    }

    #[test]
    fn reservation_should_build_from_change_feed_image() {
        let image = json!({
            "ReservationID": {"S": "r-42"},
            "RoomNumber": {"N": "101"},
            "CheckInDate": {"S": "2024-06-01"},
            "CheckOutDate": {"S": "2024-06-05"},
            "GuestName": {"S": "Ana Ruiz"},
            "ContactEmail": {"NULL": true},
            "Status": {"S": "Pendiente"},
            "CreatedAt": {"S": "2024-05-30T10:15:00.123456"},
            "Extras": {"M": {"breakfast": {"BOOL": true}}},
        });
        let item = AttributeValue::decode_item(image.as_object().unwrap());
        let rsvp = Reservation::from_attributes(&item).unwrap();

        assert_eq!(rsvp.id, "r-42");
        assert_eq!(rsvp.room_number.as_deref(), Some("101"));
        assert_eq!(rsvp.guest_name.as_deref(), Some("Ana Ruiz"));
        assert_eq!(rsvp.contact_email, None);
        assert!(rsvp.is_pending());
        assert!(rsvp.created_at.is_some());
        assert!(rsvp.updated_at.is_none());
        assert!(rsvp.validate().is_ok());
    }

    #[test]
    fn image_without_id_should_be_malformed() {
        let image = json!({"RoomNumber": {"S": "101"}});
        let item = AttributeValue::decode_item(image.as_object().unwrap());
        assert!(matches!(
            Reservation::from_attributes(&item),
            Err(Error::MalformedEvent(_))
        ));
    }

    #[test]
    fn unknown_status_should_decode_as_none() {
        let image = json!({"ReservationID": {"S": "r-1"}, "Status": {"S": "OnHold"}});
        let item = AttributeValue::decode_item(image.as_object().unwrap());
        let rsvp = Reservation::from_attributes(&item).unwrap();
        assert_eq!(rsvp.status, None);
        assert!(!rsvp.is_pending());
    }
}
