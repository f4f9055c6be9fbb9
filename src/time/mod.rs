//! Epoch handling for OEM data rows
//!
//! OEM exports stamp every state vector with a calendar epoch of the form
//! `YYYY-MM-DDThh:mm:ss.ffffff`. This module turns those tokens into a
//! normalized ISO-8601 string. Normalization never fails: a token that does
//! not have the expected shape, or that names an impossible calendar instant,
//! is handed back verbatim.
//!
//! # Time scale
//!
//! The trailing `Z` added to normalized epochs is a fixed label. OEM files
//! declare their own `TIME_SYSTEM` (UTC, TDB, TT or a mission scale) in a
//! header block this crate does not read, so no conversion happens here and
//! the suffix must not be taken as proof that the epoch is UTC.

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

/// Suffix appended to every successfully normalized epoch
pub const EPOCH_SUFFIX: &str = "Z";

/// Output layout for normalized epochs (always six fractional digits)
const NORMALIZED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

lazy_static! {
    // Calendar date, clock time and a 1-6 digit fraction; no zone designator.
    static ref EPOCH_PATTERN: Regex =
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})\.(\d{1,6})$")
            .expect("epoch pattern is valid");
}

/// Parse an OEM epoch token into a naive calendar date-time
///
/// Returns `None` when the token does not match `YYYY-MM-DDThh:mm:ss.f`
/// (1 to 6 fractional digits) or when the fields do not form a real
/// instant, e.g. month 13, February 30 or second 60.
pub fn parse_epoch(raw: &str) -> Option<NaiveDateTime> {
    let caps = EPOCH_PATTERN.captures(raw)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str());

    let year: i32 = field(1)?.parse().ok()?;
    let month: u32 = field(2)?.parse().ok()?;
    let day: u32 = field(3)?.parse().ok()?;
    let hour: u32 = field(4)?.parse().ok()?;
    let minute: u32 = field(5)?.parse().ok()?;
    let second: u32 = field(6)?.parse().ok()?;

    // "5" means 500000 microseconds, not 5
    let fraction = field(7)?;
    let micros: u32 = format!("{:0<6}", fraction).parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_micro_opt(hour, minute, second, micros)
}

/// Normalize an OEM epoch token to `YYYY-MM-DDThh:mm:ss.ffffffZ`
///
/// Falls back to returning `raw` unchanged when it cannot be parsed.
///
/// ```
/// use oemfield::time::normalize_epoch;
///
/// assert_eq!(
///     normalize_epoch("2021-03-04T10:15:30.500000"),
///     "2021-03-04T10:15:30.500000Z"
/// );
/// assert_eq!(normalize_epoch("not-a-date"), "not-a-date");
/// ```
pub fn normalize_epoch(raw: &str) -> String {
    match parse_epoch(raw) {
        Some(epoch) => format!("{}{}", epoch.format(NORMALIZED_FORMAT), EPOCH_SUFFIX),
        None => raw.to_string(),
    }
}
