//! XMLTV date/time parsing.
//!
//! Dates are `YYYYMMDDhhmmss` or any leading part of it (at least the year),
//! optionally followed by a space and a `+HHMM`/`-HHMM` offset. No offset
//! means UTC. Examples: `200209`, `20070708000000`, `19880523083000 +0300`.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::logger::ListingLogger;

/// Fills the fields a partial date leaves out.
const COMPLETE_DATE: &str = "20000101000000";
const UTC_OFFSET: &str = "+00:00";

static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn date_pattern() -> &'static Regex {
    DATE_PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<digits>[0-9]{4,14})(\s(?P<offset>[+-][0-9]{4}))?$")
            .expect("Invalid XMLTV date pattern")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("'{0}' is not an XMLTV date")]
    NoMatch(String),
    #[error("unable to parse the date {value} from standardised form {standard}")]
    Invalid { value: String, standard: String },
}

/// Instant substituted for a missing or unparseable `start`/`stop`.
pub fn sentinel_date() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Pad the digits to 14 and colonise the offset: `"200209"` becomes
/// `"20020901000000 +00:00"`.
pub fn standardise(value: &str) -> Result<String, DateError> {
    let captures = date_pattern()
        .captures(value)
        .ok_or_else(|| DateError::NoMatch(value.to_string()))?;

    let digits = &captures["digits"];
    let mut standard = String::with_capacity(21);
    standard.push_str(digits);
    standard.push_str(&COMPLETE_DATE[digits.len()..]);
    standard.push(' ');
    match captures.name("offset") {
        Some(offset) => {
            let offset = offset.as_str();
            standard.push_str(&offset[..3]);
            standard.push(':');
            standard.push_str(&offset[3..]);
        }
        None => standard.push_str(UTC_OFFSET),
    }

    Ok(standard)
}

/// Parse an XMLTV date into a UTC instant. Empty input is `Ok(None)`.
pub fn normalize(value: &str) -> Result<Option<DateTime<Utc>>, DateError> {
    if value.is_empty() {
        return Ok(None);
    }

    let standard = standardise(value)?;
    DateTime::parse_from_str(&standard, "%Y%m%d%H%M%S %:z")
        .map(|parsed| Some(parsed.with_timezone(&Utc)))
        .map_err(|_| DateError::Invalid {
            value: value.to_string(),
            standard,
        })
}

/// Like [`normalize`], but failures are logged as warnings and read as absent.
pub fn parse_date(value: &str, logger: &dyn ListingLogger) -> Option<DateTime<Utc>> {
    match normalize(value) {
        Ok(date) => date,
        Err(e) => {
            logger.warn(format_args!("{}", e));
            None
        }
    }
}
