//! Calendar error types.

use chrono::NaiveDate;

/// Errors from loading override tables or checking coverage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// No override table for a year in the requested window; dates in it
    /// are classified by weekday alone
    #[error("no holiday overrides for {year}, using weekday/weekend only")]
    OverrideMissing { year: i32 },

    /// A table lists a date that belongs to another year
    #[error("table for {year} contains {date}")]
    DateOutsideYear { year: i32, date: NaiveDate },

    /// A table document could not be parsed
    #[error("invalid override table: {message}")]
    InvalidTable { message: String },

    /// Reading table files failed
    #[error("calendar IO error: {message}")]
    Io { message: String },
}
