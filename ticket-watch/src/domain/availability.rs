//! Ticket availability snapshots.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::seat::{SEATS_UNDISCLOSED, SeatClass};
use super::station::StationCode;

/// A ticket price, held in fen (1/100 yuan) to keep arithmetic exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_fen(fen: u64) -> Self {
        Price(fen)
    }

    pub fn fen(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// What one train offers on one travel date, as of one poll.
///
/// Snapshots are immutable and keyed by `(travel_date, train_number)`.
/// A newer snapshot for the same key replaces the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketAvailability {
    /// Train number as reported upstream (not necessarily a valid
    /// [`TrainNumber`](super::TrainNumber); purely numeric services exist).
    pub train_number: String,
    pub from_station: StationCode,
    pub to_station: StationCode,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    /// Journey duration as displayed upstream ("HH:MM").
    pub duration: String,
    /// Remaining seats per class; classes the train does not offer are 0.
    pub remaining_seats: BTreeMap<SeatClass, u32>,
    pub price: Price,
    pub travel_date: NaiveDate,
}

impl TicketAvailability {
    /// The identity of this snapshot.
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.travel_date, self.train_number.as_str())
    }

    /// Remaining seats in a class (0 when the class is absent).
    pub fn seats(&self, class: SeatClass) -> u32 {
        self.remaining_seats.get(&class).copied().unwrap_or(0)
    }

    /// Whether any seat of this class can be bought.
    pub fn has_seats(&self, class: SeatClass) -> bool {
        self.seats(class) > 0
    }

    /// Whether the class is available but the count was withheld.
    pub fn is_undisclosed(&self, class: SeatClass) -> bool {
        self.seats(class) == SEATS_UNDISCLOSED
    }
}
