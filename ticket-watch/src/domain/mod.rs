//! Domain types for the ticket watcher.
//!
//! This module contains the core domain model types: validated station
//! codes and train numbers, availability snapshots, commute preferences
//! and the purchase task records. Types enforce their invariants at
//! construction time, so code that receives them can trust their validity.

mod availability;
mod error;
mod preference;
mod seat;
mod station;
mod task;
mod train_number;

pub use availability::{Price, TicketAvailability};
pub use error::DomainError;
pub use preference::{CommutePreference, PreferenceDraft, PreferenceError};
pub use seat::{SEATS_UNDISCLOSED, SeatClass, UnknownSeatClass};
pub use station::{InvalidStationCode, Station, StationCode};
pub use task::{
    ExternalProcessRef, PurchaseKey, PurchaseStatus, RpaStatus, RpaTask, RpaTaskId,
    TicketPurchase, UserId, WatchStatus, WatchTask, WatchTaskId,
};
pub use train_number::{InvalidTrainNumber, TrainNumber};
