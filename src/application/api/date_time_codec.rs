//! ISO-8601 date-time text for the wire format of persons.
//!
//! Accepted: `YYYY-MM-DDTHH:MM[:SS[.fraction]]` with an optional trailing `Z`
//! or `±HH:MM` offset, which is dropped. Years outside `0000..=9999` carry a
//! sign and may have more than four digits (`+10000`, `-0001`). Produced:
//! `YYYY-MM-DDTHH:MM:SS` plus the shortest fraction that keeps the sub-second
//! part, when it is not zero. Minute-only times, fractions with trailing
//! zeros and offsets are accepted but come back normalized.

use chrono::{DateTime, NaiveDateTime, Timelike};
use thiserror::Error;

const ENCODE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];
const NANOS_PER_SECOND: u32 = 1_000_000_000;

#[derive(Debug, Error, PartialEq)]
#[error("`{input}` is not an ISO-8601 date-time")]
pub struct ParseError {
    input: String,
}

// chrono accepts single-digit fields, so the fixed-width prefix is checked
// first: `[±]YYYY[Y..]-MM-DDTHH:MM`, the sign being required past four digits.
fn has_iso_prefix(text: &str) -> bool {
    let unsigned = text.strip_prefix(|c| c == '+' || c == '-').unwrap_or(text);
    let signed = unsigned.len() != text.len();
    let year_digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if year_digits < 4 || (!signed && year_digits > 4) {
        return false;
    }
    let rest = &unsigned.as_bytes()[year_digits..];
    rest.len() >= 12
        && rest[..12].iter().enumerate().all(|(i, b)| match i {
            0 | 3 => *b == b'-',
            6 => *b == b'T',
            9 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

pub fn decode(text: &str) -> Result<NaiveDateTime, ParseError> {
    let error = || ParseError {
        input: text.to_owned(),
    };
    if !has_iso_prefix(text) {
        return Err(error());
    }
    let local = text.strip_suffix('Z').unwrap_or(text);
    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
        .or_else(|| {
            OFFSET_FORMATS.iter().find_map(|format| {
                DateTime::parse_from_str(text, format)
                    .ok()
                    .map(|date_time| date_time.naive_local())
            })
        })
        .ok_or_else(error)
}

pub fn encode(date_time: &NaiveDateTime) -> String {
    let mut text = date_time.format(ENCODE_FORMAT).to_string();
    // A leap second keeps its extra second in the nanoseconds.
    let nanos = date_time.nanosecond() % NANOS_PER_SECOND;
    if nanos != 0 {
        let fraction = format!("{:09}", nanos);
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text
}

/// Serde adapter for optional timestamps, for use with `#[serde(with = ...)]`.
pub mod option {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date_time) => serializer.serialize_str(&super::encode(date_time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::decode(&text).map_err(D::Error::custom))
            .transpose()
    }
}
