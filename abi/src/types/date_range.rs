use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{is_overlapping, parse_date, Error};

/// A stay `[start, end)`: the guest holds the room from check-in day up to, not including,
/// check-out day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, Error> {
        if start >= end {
            return Err(Error::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(check_in: &str, check_out: &str) -> Result<Self, Error> {
        Self::new(
            parse_date("CheckInDate", check_in)?,
            parse_date("CheckOutDate", check_out)?,
        )
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        is_overlapping(self.start, self.end, other.start, other.end)
    }
}
