use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Conflict,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Conflict => "Conflict",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Status a pending reservation moves to once `conflicts` overlapping bookings were found.
    pub fn reconciled(conflicts: usize) -> Self {
        if conflicts == 0 {
            Self::Confirmed
        } else {
            Self::Conflict
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    /// Case-insensitive. The Spanish labels written by the booking front end are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendiente" => Ok(Self::Pending),
            "confirmed" | "confirmada" => Ok(Self::Confirmed),
            "conflict" | "conflicto" => Ok(Self::Conflict),
            "cancelled" | "canceled" | "cancelada" => Ok(Self::Cancelled),
            _ => Err(Error::UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_should_parse_canonical_and_legacy_labels() {
        assert_eq!("Pending".parse::<ReservationStatus>().unwrap(), ReservationStatus::Pending);
        assert_eq!("CONFIRMED".parse::<ReservationStatus>().unwrap(), ReservationStatus::Confirmed);
        assert_eq!("Pendiente".parse::<ReservationStatus>().unwrap(), ReservationStatus::Pending);
        assert_eq!("Conflicto".parse::<ReservationStatus>().unwrap(), ReservationStatus::Conflict);
        assert_eq!("Cancelada".parse::<ReservationStatus>().unwrap(), ReservationStatus::Cancelled);
        assert_eq!(
            "Archived".parse::<ReservationStatus>().unwrap_err(),
            Error::UnknownStatus("Archived".into())
        );
    }

    #[test]
    fn reconciled_status_depends_on_conflict_count() {
        assert_eq!(ReservationStatus::reconciled(0), ReservationStatus::Confirmed);
        assert_eq!(ReservationStatus::reconciled(1), ReservationStatus::Conflict);
        assert_eq!(ReservationStatus::reconciled(7), ReservationStatus::Conflict);
    }
}
