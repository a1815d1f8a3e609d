//! Wire record decoding.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime};
use regex_lite::Regex;
use tracing::warn;

use crate::domain::{Price, SEATS_UNDISCLOSED, SeatClass, StationCode, TicketAvailability};

use super::error::ParseError;

/// A record must reach the business-class token at offset 32.
pub const REQUIRED_FIELDS: usize = 33;

const TRAIN_NUMBER: usize = 3;
const FROM_STATION: usize = 6;
const TO_STATION: usize = 7;
const DEPARTURE: usize = 8;
const ARRIVAL: usize = 9;
const DURATION: usize = 10;

static PRICE: OnceLock<Regex> = OnceLock::new();

fn price_regex() -> &'static Regex {
    PRICE.get_or_init(|| Regex::new(r"¥(\d+)(?:\.(\d{1,2}))?").expect("price pattern is valid"))
}

/// Decode one wire record for the given travel date.
///
/// Never panics. A short record or an undecodable identity field
/// (train number, station code, time) is an error; seat tokens and the
/// price are lenient and fall back to 0.
pub fn parse_record(raw: &str, travel_date: NaiveDate) -> Result<TicketAvailability, ParseError> {
    let fields: Vec<&str> = raw.split('|').collect();
    if fields.len() < REQUIRED_FIELDS {
        return Err(ParseError::TooFewFields {
            found: fields.len(),
            required: REQUIRED_FIELDS,
        });
    }

    let train_number = fields[TRAIN_NUMBER].trim();
    if train_number.is_empty() {
        return Err(ParseError::MissingTrainNumber);
    }

    let remaining_seats: BTreeMap<SeatClass, u32> = SeatClass::ALL
        .iter()
        .map(|class| (*class, parse_seat_token(fields[class.wire_offset()])))
        .collect();

    Ok(TicketAvailability {
        train_number: train_number.to_string(),
        from_station: station_field(&fields, FROM_STATION)?,
        to_station: station_field(&fields, TO_STATION)?,
        departure_time: time_field(&fields, DEPARTURE)?,
        arrival_time: time_field(&fields, ARRIVAL)?,
        duration: fields[DURATION].trim().to_string(),
        remaining_seats,
        price: parse_price(raw),
        travel_date,
    })
}

/// Decode one remaining-seat token.
///
/// - `无` (sold out), `*` (not offered) and the empty string are 0
/// - `有` means available with the count withheld: [`SEATS_UNDISCLOSED`]
/// - a digit string is its value
/// - anything else is 0, with a warning
pub fn parse_seat_token(token: &str) -> u32 {
    let token = token.trim();
    match token {
        "无" | "*" | "" => 0,
        "有" => SEATS_UNDISCLOSED,
        digits if digits.bytes().all(|b| b.is_ascii_digit()) => match digits.parse::<u32>() {
            Ok(n) if n != SEATS_UNDISCLOSED => n,
            _ => {
                warn!(token = digits, "seat count out of range, treating as sold out");
                0
            }
        },
        other => {
            warn!(token = other, "unrecognised seat token, treating as sold out");
            0
        }
    }
}

/// Extract the first `¥<yuan>[.<jiao/fen>]` token anywhere in the record.
pub fn parse_price(raw: &str) -> Price {
    let Some(caps) = price_regex().captures(raw) else {
        return Price::ZERO;
    };

    let yuan = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<u64>().ok());
    let fraction = match caps.get(2).map(|m| m.as_str()) {
        Some(f) if f.len() == 1 => f.parse::<u64>().ok().map(|n| n * 10),
        Some(f) => f.parse::<u64>().ok(),
        None => Some(0),
    };

    match (yuan, fraction) {
        (Some(yuan), Some(fraction)) => yuan
            .checked_mul(100)
            .and_then(|fen| fen.checked_add(fraction))
            .map(Price::from_fen)
            .unwrap_or(Price::ZERO),
        _ => Price::ZERO,
    }
}

fn station_field(fields: &[&str], index: usize) -> Result<StationCode, ParseError> {
    let value = fields[index].trim();
    StationCode::parse(value).map_err(|_| ParseError::InvalidStation {
        field: index,
        value: value.to_string(),
    })
}

fn time_field(fields: &[&str], index: usize) -> Result<NaiveTime, ParseError> {
    let value = fields[index].trim();
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ParseError::InvalidTime {
        field: index,
        value: value.to_string(),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary input never panics
        #[test]
        fn parse_never_panics(raw in ".*") {
            let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let _ = parse_record(&raw, date);
            let _ = parse_seat_token(&raw);
            let _ = parse_price(&raw);
        }

        /// Short records are always rejected, never partially populated
        #[test]
        fn short_records_rejected(
            fields in prop::collection::vec("[^|]{0,6}", 1..REQUIRED_FIELDS)
        ) {
            let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let raw = fields.join("|");
            let is_too_short = matches!(
                parse_record(&raw, date),
                Err(ParseError::TooFewFields { .. })
            );
            prop_assert!(is_too_short);
        }

        /// Digit tokens parse to their value
        #[test]
        fn digit_tokens(n in 0u32..100_000) {
            prop_assert_eq!(parse_seat_token(&n.to_string()), n);
        }
    }
}
