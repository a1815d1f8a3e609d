//! Published poll results.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::TicketAvailability;

/// One preferred train on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    #[serde(flatten)]
    pub ticket: TicketAvailability,
    /// Already bought by this user; shown but not purchasable.
    pub purchased: bool,
}

/// What one cycle learned about one candidate date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DateAvailability {
    /// The query succeeded. Preferred trains that do not run that day
    /// are simply absent.
    Available {
        trains: BTreeMap<String, AvailabilityEntry>,
    },
    /// Nothing is known for this date this cycle.
    NoData { reason: String },
}

impl DateAvailability {
    pub fn entry(&self, train_number: &str) -> Option<&AvailabilityEntry> {
        match self {
            DateAvailability::Available { trains } => trains.get(train_number),
            DateAvailability::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, DateAvailability::NoData { .. })
    }
}

/// The complete result of one poll cycle.
///
/// Never mutated after publication; a new cycle publishes a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySnapshot {
    /// Monotonic per poller, starting at 1.
    pub cycle: u64,
    pub generated_at: DateTime<Utc>,
    pub dates: BTreeMap<NaiveDate, DateAvailability>,
}

impl AvailabilitySnapshot {
    pub fn date(&self, date: NaiveDate) -> Option<&DateAvailability> {
        self.dates.get(&date)
    }

    /// Every retained entry, by date then train number.
    pub fn entries(&self) -> impl Iterator<Item = &AvailabilityEntry> {
        self.dates
            .values()
            .filter_map(|d| match d {
                DateAvailability::Available { trains } => Some(trains.values()),
                DateAvailability::NoData { .. } => None,
            })
            .flatten()
    }
}
