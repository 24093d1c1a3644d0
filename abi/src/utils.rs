use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::Error;

/// Calendar format used for check-in and check-out dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open interval intersection: `[a_in, a_out)` and `[b_in, b_out)` collide iff
/// `a_in < b_out && a_out > b_in`. A check-out on the same day as another check-in is not a
/// collision.
///
/// Reconciliation and the availability check both go through this function.
pub fn is_overlapping(a_in: NaiveDate, a_out: NaiveDate, b_in: NaiveDate, b_out: NaiveDate) -> bool {
    a_in < b_out && a_out > b_in
}

pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Accepts RFC 3339, or a naive ISO-8601 timestamp which is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}
