mod attribute;
mod config;
mod error;
mod event;
mod types;
mod utils;

pub use attribute::AttributeValue;
pub use config::*;
pub use error::Error;
pub use event::*;
pub use types::*;
pub use utils::*;

pub type ReservationId = String;
