use thiserror::Error;

use crate::ReservationId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error")]
    DbError(#[from] sqlx::Error),

    #[error("failed to read configuration file")]
    ConfigReadError,

    #[error("failed to parse configuration file")]
    ConfigParseError,

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("unknown reservation status: {0}")]
    UnknownStatus(String),

    #[error("reservation {0} not found")]
    NotFound(ReservationId),

    #[error("incomplete reservation data, missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid date {value:?} for {field}")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid stay: check-in {start} is not before check-out {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("status update for reservation {0} was rejected: it is missing or no longer pending")]
    UpdateRejected(ReservationId),

    #[error("alert channel is not configured")]
    NotifierNotConfigured,

    #[error("failed to dispatch alert: {0}")]
    Notification(String),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl Error {
    /// Problems with the incoming event or the record it points at. The record is skipped and
    /// the caller sees a 400.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedEvent(_)
                | Self::InvalidAttribute(_)
                | Self::NotFound(_)
                | Self::MissingFields(_)
                | Self::InvalidDate { .. }
                | Self::InvalidDateRange { .. }
        )
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::DbError(_), Self::DbError(_)) => true,
            (Self::ConfigReadError, Self::ConfigReadError) => true,
            (Self::ConfigParseError, Self::ConfigParseError) => true,
            (Self::MalformedEvent(a), Self::MalformedEvent(b)) => a == b,
            (Self::InvalidAttribute(a), Self::InvalidAttribute(b)) => a == b,
            (Self::UnknownStatus(a), Self::UnknownStatus(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::MissingFields(a), Self::MissingFields(b)) => a == b,
            (
                Self::InvalidDate { field, value },
                Self::InvalidDate {
                    field: f2,
                    value: v2,
                },
            ) => field == f2 && value == v2,
            (
                Self::InvalidDateRange { start, end },
                Self::InvalidDateRange { start: s2, end: e2 },
            ) => start == s2 && end == e2,
            (Self::UpdateRejected(a), Self::UpdateRejected(b)) => a == b,
            (Self::NotifierNotConfigured, Self::NotifierNotConfigured) => true,
            (Self::Notification(a), Self::Notification(b)) => a == b,
            (Self::Unexpected(a), Self::Unexpected(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_should_be_classified() {
        assert!(Error::MalformedEvent("x".into()).is_input_error());
        assert!(Error::NotFound("id".into()).is_input_error());
        assert!(Error::MissingFields(vec!["RoomNumber"]).is_input_error());
        assert!(!Error::UpdateRejected("id".into()).is_input_error());
        assert!(!Error::Unexpected("boom".into()).is_input_error());
        assert!(!Error::DbError(sqlx::Error::RowNotFound).is_input_error());
    }

    #[test]
    fn missing_fields_message_should_list_fields() {
        let err = Error::MissingFields(vec!["RoomNumber", "CheckOutDate"]);
        assert_eq!(
            err.to_string(),
            "incomplete reservation data, missing fields: RoomNumber, CheckOutDate"
        );
    }
}
