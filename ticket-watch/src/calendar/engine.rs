//! Date classification and candidate windows.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::error::CalendarError;
use super::overrides::OverrideTables;

/// How a date is treated for commuting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Workday,
    Weekend,
    Holiday,
    /// A weekend day worked to make up for a holiday.
    AdjustedWorkday,
}

impl DayKind {
    /// Whether people commute on this kind of day.
    pub fn is_working_day(self) -> bool {
        matches!(self, DayKind::Workday | DayKind::AdjustedWorkday)
    }
}

/// Which dates count as candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    AllDays,
    #[default]
    WorkdaysOnly,
}

/// Classifies dates against a fixed set of override tables.
///
/// Classification is a pure function of the date and the tables, so
/// results are reproducible in tests and across processes.
#[derive(Debug, Clone, Default)]
pub struct CalendarEngine {
    tables: OverrideTables,
}

impl CalendarEngine {
    pub fn new(tables: OverrideTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &OverrideTables {
        &self.tables
    }

    /// Classify a date.
    ///
    /// Precedence: holiday table, then adjusted-workday table, then
    /// day of week.
    pub fn classify(&self, date: NaiveDate) -> DayKind {
        if self.tables.is_holiday(date) {
            return DayKind::Holiday;
        }
        if self.tables.is_adjusted_workday(date) {
            return DayKind::AdjustedWorkday;
        }
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => DayKind::Weekend,
            _ => DayKind::Workday,
        }
    }

    pub fn is_workday(&self, date: NaiveDate) -> bool {
        self.classify(date).is_working_day()
    }

    /// The first `n` dates on or after `anchor` that pass `filter`, ascending.
    pub fn next_n_candidate_dates(
        &self,
        n: usize,
        anchor: NaiveDate,
        filter: DateFilter,
    ) -> Vec<NaiveDate> {
        anchor
            .iter_days()
            .filter(|d| match filter {
                DateFilter::AllDays => true,
                DateFilter::WorkdaysOnly => self.is_workday(*d),
            })
            .take(n)
            .collect()
    }

    /// Report the first year in `dates` that has no override table.
    ///
    /// Missing coverage never stops classification; callers log it so
    /// an operator knows a new year's data is due.
    pub fn check_coverage(&self, dates: &[NaiveDate]) -> Result<(), CalendarError> {
        let years: BTreeSet<i32> = dates.iter().map(|d| d.year()).collect();
        match years.into_iter().find(|y| !self.tables.covers(*y)) {
            Some(year) => Err(CalendarError::OverrideMissing { year }),
            None => Ok(()),
        }
    }
}
