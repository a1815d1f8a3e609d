//! Commute preferences.
//!
//! Preferences arrive from an external store with unpredictable
//! completeness. [`PreferenceDraft`] models what was actually stored;
//! [`CommutePreference`] can only be obtained by validating a draft, so a
//! poller that holds one never needs to check for missing fields.

use serde::{Deserialize, Serialize};

use super::seat::SeatClass;
use super::train_number::{InvalidTrainNumber, TrainNumber};

/// Why a draft could not become a [`CommutePreference`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceError {
    /// One or more required fields were absent or blank
    #[error("incomplete preference, missing: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A train number did not match the accepted format
    #[error(transparent)]
    InvalidTrain(#[from] InvalidTrainNumber),

    /// The seat type is not a known class
    #[error("unknown seat type: {0}")]
    UnknownSeatType(String),

    /// Origin and destination are the same station
    #[error("origin and destination are both {0}")]
    SameStation(String),
}

/// A preference exactly as stored, with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceDraft {
    pub from_station: Option<String>,
    pub to_station: Option<String>,
    pub morning_train_number: Option<String>,
    pub evening_train_number: Option<String>,
    pub seat_type: Option<String>,
}

/// A complete, validated commute preference.
///
/// One preference per user: both the morning and the evening train are
/// looked up on the `from_station` → `to_station` route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommutePreference {
    pub from_station: String,
    pub to_station: String,
    pub morning_train_number: TrainNumber,
    pub evening_train_number: TrainNumber,
    pub seat_type: SeatClass,
}

impl CommutePreference {
    /// The train numbers a poller should keep.
    pub fn trains(&self) -> [&TrainNumber; 2] {
        [&self.morning_train_number, &self.evening_train_number]
    }

    /// Whether a reported train number is one of the preferred trains.
    pub fn wants(&self, train_number: &str) -> bool {
        self.trains().iter().any(|t| t.as_str() == train_number)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TryFrom<PreferenceDraft> for CommutePreference {
    type Error = PreferenceError;

    fn try_from(draft: PreferenceDraft) -> Result<Self, Self::Error> {
        let from = present(&draft.from_station);
        let to = present(&draft.to_station);
        let morning = present(&draft.morning_train_number);
        let evening = present(&draft.evening_train_number);
        let seat = present(&draft.seat_type);

        let mut missing = Vec::new();
        if from.is_none() {
            missing.push("fromStation");
        }
        if to.is_none() {
            missing.push("toStation");
        }
        if morning.is_none() {
            missing.push("morningTrainNumber");
        }
        if evening.is_none() {
            missing.push("eveningTrainNumber");
        }
        if seat.is_none() {
            missing.push("seatType");
        }

        let (Some(from), Some(to), Some(morning), Some(evening), Some(seat)) =
            (from, to, morning, evening, seat)
        else {
            return Err(PreferenceError::Missing(missing));
        };

        if from == to {
            return Err(PreferenceError::SameStation(from.to_string()));
        }

        let seat_type = seat
            .parse::<SeatClass>()
            .map_err(|_| PreferenceError::UnknownSeatType(seat.to_string()))?;

        Ok(CommutePreference {
            from_station: from.to_string(),
            to_station: to.to_string(),
            morning_train_number: TrainNumber::parse(morning)?,
            evening_train_number: TrainNumber::parse(evening)?,
            seat_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_draft() -> PreferenceDraft {
        PreferenceDraft {
            from_station: Some("北京".to_string()),
            to_station: Some("上海".to_string()),
            morning_train_number: Some("G1".to_string()),
            evening_train_number: Some("G2".to_string()),
            seat_type: Some("二等座".to_string()),
        }
    }

    #[test]
    fn complete_draft_validates() {
        let pref = CommutePreference::try_from(full_draft()).unwrap();
        assert_eq!(pref.from_station, "北京");
        assert_eq!(pref.morning_train_number.as_str(), "G1");
        assert_eq!(pref.seat_type, SeatClass::SecondClass);
        assert!(pref.wants("G1"));
        assert!(pref.wants("G2"));
        assert!(!pref.wants("G3"));
    }

    #[test]
    fn empty_draft_lists_every_field() {
        let err = CommutePreference::try_from(PreferenceDraft::default()).unwrap_err();
        assert_eq!(
            err,
            PreferenceError::Missing(vec![
                "fromStation",
                "toStation",
                "morningTrainNumber",
                "eveningTrainNumber",
                "seatType"
            ])
        );
    }

    #[test]
    fn blank_counts_as_missing() {
        let draft = PreferenceDraft {
            evening_train_number: Some("   ".to_string()),
            ..full_draft()
        };
        let err = CommutePreference::try_from(draft).unwrap_err();
        assert_eq!(err, PreferenceError::Missing(vec!["eveningTrainNumber"]));
    }

    #[test]
    fn bad_train_number_rejected() {
        let draft = PreferenceDraft {
            morning_train_number: Some("g1".to_string()),
            ..full_draft()
        };
        assert!(matches!(
            CommutePreference::try_from(draft),
            Err(PreferenceError::InvalidTrain(_))
        ));
    }

    #[test]
    fn unknown_seat_rejected() {
        let draft = PreferenceDraft {
            seat_type: Some("站票".to_string()),
            ..full_draft()
        };
        assert_eq!(
            CommutePreference::try_from(draft),
            Err(PreferenceError::UnknownSeatType("站票".to_string()))
        );
    }

    #[test]
    fn same_station_rejected() {
        let draft = PreferenceDraft {
            to_station: Some("北京".to_string()),
            ..full_draft()
        };
        assert!(matches!(
            CommutePreference::try_from(draft),
            Err(PreferenceError::SameStation(_))
        ));
    }

    #[test]
    fn draft_from_camel_case_json() {
        let json = r#"{"fromStation":"北京","toStation":"上海","morningTrainNumber":"G1"}"#;
        let draft: PreferenceDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.morning_train_number.as_deref(), Some("G1"));
        assert!(draft.evening_train_number.is_none());
    }
}
