//! Business-day calendar.
//!
//! Classifies dates as workday, weekend, holiday or adjusted workday using
//! year-keyed override tables, and produces the candidate date windows
//! the availability poller queries.

mod engine;
mod error;
mod overrides;

pub use engine::{CalendarEngine, DateFilter, DayKind};
pub use error::CalendarError;
pub use overrides::{OverrideTables, YearOverrides};
