mod date_range;
mod reservation;
mod reservation_status;
mod scan_filter;

pub use date_range::DateRange;
pub use reservation::*;
pub use reservation_status::ReservationStatus;
pub use scan_filter::{ScanFilter, ScanFilterBuilder, ScanFilterBuilderError};
