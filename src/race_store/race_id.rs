//! Canonical race identifiers.
//!
//! A race is identified by `{date}-{venue}-{race number as two digits}`, e.g.
//! `20260201-11-01`. Every component has a fixed width once validated, which
//! keeps the mapping injective and lets the id be parsed back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Venue used by the dummy ingestion flow.
pub const DEFAULT_VENUE_CODE: &str = "11";

/// Race number used by the dummy ingestion flow.
pub const DEFAULT_RACE_NUMBER: u32 = 1;

const MAX_VENUE_CODE: u32 = 24;
const MAX_RACE_NUMBER: u32 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RaceKeyError {
    #[error("Invalid race date '{0}': expected a calendar date as YYYYMMDD")]
    InvalidDate(String),

    #[error("Invalid venue code '{0}': expected two digits between 01 and 24")]
    InvalidVenueCode(String),

    #[error("Invalid race number {0}: expected a value between 1 and 12")]
    InvalidRaceNumber(u32),

    #[error("Malformed race id '{0}'")]
    MalformedRaceId(String),
}

/// Canonical string key of a race.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(String);

impl RaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps an id read back from storage, where it was written by [`compose`].
    pub(crate) fn from_stored(id: String) -> Self {
        RaceId(id)
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds the race id from its parts. Pure: no validation and no I/O.
pub fn compose(date: &str, venue_code: &str, race_number: u32) -> RaceId {
    RaceId(format!("{}-{}-{:02}", date, venue_code, race_number))
}

/// Validated (date, venue, race number) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceKey {
    date: String,
    venue_code: String,
    race_number: u32,
}

impl RaceKey {
    pub fn new(date: &str, venue_code: &str, race_number: u32) -> Result<Self, RaceKeyError> {
        validate_date(date)?;
        validate_venue_code(venue_code)?;
        if !(1..=MAX_RACE_NUMBER).contains(&race_number) {
            return Err(RaceKeyError::InvalidRaceNumber(race_number));
        }
        Ok(Self {
            date: date.to_string(),
            venue_code: venue_code.to_string(),
            race_number,
        })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn venue_code(&self) -> &str {
        &self.venue_code
    }

    pub fn race_number(&self) -> u32 {
        self.race_number
    }

    pub fn race_id(&self) -> RaceId {
        compose(&self.date, &self.venue_code, self.race_number)
    }
}

impl FromStr for RaceKey {
    type Err = RaceKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RaceKeyError::MalformedRaceId(s.to_string());
        let mut parts = s.split('-');
        let (Some(date), Some(venue), Some(number), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if !all_ascii_digits(number, 2) {
            return Err(malformed());
        }
        let race_number = number.parse::<u32>().map_err(|_| malformed())?;
        RaceKey::new(date, venue, race_number)
    }
}

fn all_ascii_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn validate_date(date: &str) -> Result<(), RaceKeyError> {
    if !all_ascii_digits(date, 8) || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
        return Err(RaceKeyError::InvalidDate(date.to_string()));
    }
    Ok(())
}

fn validate_venue_code(venue_code: &str) -> Result<(), RaceKeyError> {
    let in_range = all_ascii_digits(venue_code, 2)
        && venue_code
            .parse::<u32>()
            .map(|code| (1..=MAX_VENUE_CODE).contains(&code))
            .unwrap_or(false);
    if !in_range {
        return Err(RaceKeyError::InvalidVenueCode(venue_code.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_zero_padded_race_number() {
        assert_eq!(compose("20260201", "11", 1).as_str(), "20260201-11-01");
        assert_eq!(compose("20260201", "04", 12).as_str(), "20260201-04-12");
    }

    #[test]
    fn compose_is_stable() {
        let first = compose("20260201", "11", 7);
        let second = compose("20260201", "11", 7);
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_keys_never_collide() {
        let mut seen = std::collections::HashSet::new();
        for date in ["20260201", "20260202"] {
            for venue in 1..=MAX_VENUE_CODE {
                for race_number in 1..=MAX_RACE_NUMBER {
                    let key = RaceKey::new(date, &format!("{:02}", venue), race_number).unwrap();
                    assert!(seen.insert(key.race_id()));
                }
            }
        }
        assert_eq!(seen.len(), 2 * 24 * 12);
    }

    #[test]
    fn rejects_malformed_dates() {
        for date in ["2026021", "2026-02-01", "20260230", "abcdefgh", "202602011", ""] {
            assert_eq!(
                RaceKey::new(date, "11", 1),
                Err(RaceKeyError::InvalidDate(date.to_string())),
                "date {:?} should be rejected",
                date
            );
        }
    }

    #[test]
    fn rejects_out_of_range_venue_and_race_number() {
        assert!(matches!(
            RaceKey::new("20260201", "1", 1),
            Err(RaceKeyError::InvalidVenueCode(_))
        ));
        assert!(matches!(
            RaceKey::new("20260201", "00", 1),
            Err(RaceKeyError::InvalidVenueCode(_))
        ));
        assert!(matches!(
            RaceKey::new("20260201", "25", 1),
            Err(RaceKeyError::InvalidVenueCode(_))
        ));
        assert_eq!(
            RaceKey::new("20260201", "11", 0),
            Err(RaceKeyError::InvalidRaceNumber(0))
        );
        assert_eq!(
            RaceKey::new("20260201", "11", 13),
            Err(RaceKeyError::InvalidRaceNumber(13))
        );
    }

    #[test]
    fn parses_race_id_back_into_key() {
        let key: RaceKey = "20260201-11-01".parse().unwrap();
        assert_eq!(key.date(), "20260201");
        assert_eq!(key.venue_code(), "11");
        assert_eq!(key.race_number(), 1);
        assert_eq!(key.race_id().as_str(), "20260201-11-01");
    }

    #[test]
    fn rejects_malformed_race_ids() {
        for id in [
            "20260201-11-1",
            "20260201-11",
            "20260201-11-01-02",
            "x-11-01",
            "20260201-11-+1",
            "20260201-11- 1",
        ] {
            assert!(id.parse::<RaceKey>().is_err(), "{} should not parse", id);
        }
    }
}
