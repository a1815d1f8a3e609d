//! Train number type.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a train number is not in the accepted format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid train number {value:?}: expected a letter followed by 1-4 digits")]
pub struct InvalidTrainNumber {
    value: String,
}

/// A validated train number such as `G1`, `D3125` or `K511`.
///
/// The accepted format is one uppercase letter (the service class: G, D,
/// C, Z, T, K, ...) followed by one to four digits. Purely numeric
/// services exist upstream but cannot be selected as a commute train.
///
/// # Examples
///
/// ```
/// use ticket_watch::domain::TrainNumber;
///
/// let g = TrainNumber::parse("G1234").unwrap();
/// assert_eq!(g.as_str(), "G1234");
/// assert_eq!(g.class_letter(), 'G');
///
/// assert!(TrainNumber::parse("g1").is_err());
/// assert!(TrainNumber::parse("G12345").is_err());
/// assert!(TrainNumber::parse("1461").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrainNumber(String);

impl TrainNumber {
    /// Parse a train number, checking `^[A-Z]\d{1,4}$`.
    pub fn parse(s: &str) -> Result<Self, InvalidTrainNumber> {
        let bytes = s.as_bytes();
        let invalid = || InvalidTrainNumber {
            value: s.to_string(),
        };

        let (first, digits) = bytes.split_first().ok_or_else(invalid)?;

        if !first.is_ascii_uppercase() {
            return Err(invalid());
        }

        if digits.is_empty() || digits.len() > 4 || !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        Ok(TrainNumber(s.to_string()))
    }

    /// Returns the train number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the leading service-class letter.
    pub fn class_letter(&self) -> char {
        self.0.as_bytes()[0] as char
    }
}

impl fmt::Debug for TrainNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainNumber({})", self.0)
    }
}

impl fmt::Display for TrainNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TrainNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TrainNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TrainNumber::parse(&s).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Anything matching the pattern parses and roundtrips
        #[test]
        fn valid_roundtrip(s in "[A-Z][0-9]{1,4}") {
            let parsed = TrainNumber::parse(&s).unwrap();
            prop_assert_eq!(parsed.as_str(), s.as_str());
        }

        /// Lowercase class letters are always rejected
        #[test]
        fn lowercase_rejected(s in "[a-z][0-9]{1,4}") {
            prop_assert!(TrainNumber::parse(&s).is_err());
        }

        /// Five or more digits are always rejected
        #[test]
        fn long_rejected(s in "[A-Z][0-9]{5,8}") {
            prop_assert!(TrainNumber::parse(&s).is_err());
        }
    }
}
