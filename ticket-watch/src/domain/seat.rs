//! Seat classes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Remaining-seat count reported when the provider says "有" (available)
/// without disclosing a number.
pub const SEATS_UNDISCLOSED: u32 = u32::MAX;

/// A fare/seat category with its own remaining-count field on the wire.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SeatClass {
    Business,
    FirstClass,
    #[default]
    SecondClass,
    SoftSleeper,
    HardSleeper,
    HardSeat,
    NoSeat,
}

/// Error returned for an unrecognised seat class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown seat class: {0}")]
pub struct UnknownSeatClass(pub String);

impl SeatClass {
    /// Every seat class, in wire order of preference for display.
    pub const ALL: [SeatClass; 7] = [
        SeatClass::Business,
        SeatClass::FirstClass,
        SeatClass::SecondClass,
        SeatClass::SoftSleeper,
        SeatClass::HardSleeper,
        SeatClass::HardSeat,
        SeatClass::NoSeat,
    ];

    /// Position of this class's remaining-seat token in a wire record.
    pub fn wire_offset(self) -> usize {
        match self {
            SeatClass::SoftSleeper => 23,
            SeatClass::NoSeat => 26,
            SeatClass::HardSleeper => 28,
            SeatClass::HardSeat => 29,
            SeatClass::SecondClass => 30,
            SeatClass::FirstClass => 31,
            SeatClass::Business => 32,
        }
    }

    /// The snake_case identifier used in JSON.
    pub fn identifier(self) -> &'static str {
        match self {
            SeatClass::Business => "business",
            SeatClass::FirstClass => "first_class",
            SeatClass::SecondClass => "second_class",
            SeatClass::SoftSleeper => "soft_sleeper",
            SeatClass::HardSleeper => "hard_sleeper",
            SeatClass::HardSeat => "hard_seat",
            SeatClass::NoSeat => "no_seat",
        }
    }

    /// The provider's display name, also what the automation provider expects.
    pub fn chinese_name(self) -> &'static str {
        match self {
            SeatClass::Business => "商务座",
            SeatClass::FirstClass => "一等座",
            SeatClass::SecondClass => "二等座",
            SeatClass::SoftSleeper => "软卧",
            SeatClass::HardSleeper => "硬卧",
            SeatClass::HardSeat => "硬座",
            SeatClass::NoSeat => "无座",
        }
    }
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chinese_name())
    }
}

impl FromStr for SeatClass {
    type Err = UnknownSeatClass;

    /// Accepts either the Chinese display name or the snake_case identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeatClass::ALL
            .into_iter()
            .find(|class| class.chinese_name() == s || class.identifier() == s)
            .ok_or_else(|| UnknownSeatClass(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_offsets_are_distinct() {
        let mut offsets: Vec<usize> = SeatClass::ALL.iter().map(|c| c.wire_offset()).collect();
        offsets.sort_unstable();
        offsets.dedup();
        assert_eq!(offsets.len(), SeatClass::ALL.len());
        assert_eq!(offsets.last(), Some(&32));
    }

    #[test]
    fn parse_chinese_names() {
        assert_eq!("二等座".parse::<SeatClass>().unwrap(), SeatClass::SecondClass);
        assert_eq!("一等座".parse::<SeatClass>().unwrap(), SeatClass::FirstClass);
        assert_eq!("商务座".parse::<SeatClass>().unwrap(), SeatClass::Business);
        assert_eq!("无座".parse::<SeatClass>().unwrap(), SeatClass::NoSeat);
    }

    #[test]
    fn parse_identifiers() {
        assert_eq!(
            "second_class".parse::<SeatClass>().unwrap(),
            SeatClass::SecondClass
        );
        assert_eq!(
            "hard_sleeper".parse::<SeatClass>().unwrap(),
            SeatClass::HardSleeper
        );
    }

    #[test]
    fn parse_unknown() {
        let err = "豪华座".parse::<SeatClass>().unwrap_err();
        assert_eq!(err.to_string(), "unknown seat class: 豪华座");
    }

    #[test]
    fn identifier_matches_serde() {
        for class in SeatClass::ALL {
            let json = serde_json::to_string(&class).unwrap();
            assert_eq!(json, format!("\"{}\"", class.identifier()));
        }
    }

    #[test]
    fn default_is_second_class() {
        assert_eq!(SeatClass::default(), SeatClass::SecondClass);
        assert_eq!(SeatClass::default().to_string(), "二等座");
    }
}
