//! Year-partitioned holiday and adjusted-workday tables.
//!
//! Each calendar year is one JSON document:
//!
//! ```json
//! { "year": 2025, "holidays": ["2025-01-01"], "adjusted_workdays": ["2025-01-26"] }
//! ```
//!
//! Adding a year is a data change: drop a file into the calendar
//! directory, no code changes required.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::CalendarError;

const BUILTIN_YEARS: [&str; 3] = [
    include_str!("../../data/calendar/2024.json"),
    include_str!("../../data/calendar/2025.json"),
    include_str!("../../data/calendar/2026.json"),
];

/// Overrides for one calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOverrides {
    pub year: i32,
    /// Public holidays, regardless of weekday.
    #[serde(default)]
    pub holidays: BTreeSet<NaiveDate>,
    /// Weekend days that are worked to make up for a holiday.
    #[serde(default)]
    pub adjusted_workdays: BTreeSet<NaiveDate>,
}

impl YearOverrides {
    /// Parse one year's document, checking every date belongs to that year.
    pub fn from_json(json: &str) -> Result<Self, CalendarError> {
        let table: YearOverrides =
            serde_json::from_str(json).map_err(|e| CalendarError::InvalidTable {
                message: e.to_string(),
            })?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), CalendarError> {
        let stray = self
            .holidays
            .iter()
            .chain(self.adjusted_workdays.iter())
            .find(|d| d.year() != self.year);

        match stray {
            Some(date) => Err(CalendarError::DateOutsideYear {
                year: self.year,
                date: *date,
            }),
            None => Ok(()),
        }
    }
}

/// All known override tables, keyed by year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTables {
    years: BTreeMap<i32, YearOverrides>,
}

impl OverrideTables {
    /// No overrides at all; every date falls back to weekday/weekend.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The tables shipped with the crate.
    pub fn builtin() -> Result<Self, CalendarError> {
        let mut tables = Self::empty();
        for json in BUILTIN_YEARS {
            tables.insert(YearOverrides::from_json(json)?);
        }
        Ok(tables)
    }

    /// Add or replace the table for one year.
    pub fn insert(&mut self, table: YearOverrides) {
        self.years.insert(table.year, table);
    }

    /// Load every `*.json` file in a directory, replacing same-year tables.
    ///
    /// Returns the number of years loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, CalendarError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| CalendarError::Io {
            message: format!("failed to read {}: {}", dir.display(), e),
        })?;

        let mut loaded = 0;
        for entry in entries {
            let entry = entry.map_err(|e| CalendarError::Io {
                message: format!("failed to read directory entry: {}", e),
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let json = std::fs::read_to_string(&path).map_err(|e| CalendarError::Io {
                message: format!("failed to read {}: {}", path.display(), e),
            })?;
            let table = YearOverrides::from_json(&json)?;
            debug!(year = table.year, path = %path.display(), "loaded calendar overrides");
            self.insert(table);
            loaded += 1;
        }

        Ok(loaded)
    }

    /// The table for a year, if one is known.
    pub fn year(&self, year: i32) -> Option<&YearOverrides> {
        self.years.get(&year)
    }

    /// Whether a table exists for the given year.
    pub fn covers(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    /// Years with a table, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub(super) fn is_holiday(&self, date: NaiveDate) -> bool {
        self.year(date.year())
            .is_some_and(|t| t.holidays.contains(&date))
    }

    pub(super) fn is_adjusted_workday(&self, date: NaiveDate) -> bool {
        self.year(date.year())
            .is_some_and(|t| t.adjusted_workdays.contains(&date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn builtin_covers_three_years() {
        let tables = OverrideTables::builtin().unwrap();
        assert_eq!(tables.years().collect::<Vec<_>>(), vec![2024, 2025, 2026]);
        assert!(tables.is_holiday(date(2024, 10, 1)));
        assert!(tables.is_adjusted_workday(date(2024, 2, 4)));
        assert!(!tables.is_holiday(date(2024, 3, 1)));
    }

    #[test]
    fn rejects_date_from_another_year() {
        let json = r#"{"year": 2027, "holidays": ["2026-12-31"]}"#;
        let err = YearOverrides::from_json(json).unwrap_err();
        assert!(matches!(err, CalendarError::DateOutsideYear { year: 2027, .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = YearOverrides::from_json("{not json").unwrap_err();
        assert!(matches!(err, CalendarError::InvalidTable { .. }));
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let table = YearOverrides::from_json(r#"{"year": 2030}"#).unwrap();
        assert!(table.holidays.is_empty());
        assert!(table.adjusted_workdays.is_empty());
    }

    #[test]
    fn load_dir_adds_and_replaces_years() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("2027.json"),
            r#"{"year": 2027, "holidays": ["2027-01-01"], "adjusted_workdays": []}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("2024.json"),
            r#"{"year": 2024, "holidays": [], "adjusted_workdays": []}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README.txt"), "ignored").unwrap();

        let mut tables = OverrideTables::builtin().unwrap();
        let loaded = tables.load_dir(dir.path()).unwrap();

        assert_eq!(loaded, 2);
        assert!(tables.covers(2027));
        assert!(tables.is_holiday(date(2027, 1, 1)));
        // 2024 replaced by an empty table
        assert!(!tables.is_holiday(date(2024, 10, 1)));
    }

    #[test]
    fn load_dir_missing_directory() {
        let mut tables = OverrideTables::empty();
        let err = tables.load_dir("/nonexistent/calendar").unwrap_err();
        assert!(matches!(err, CalendarError::Io { .. }));
    }
}
