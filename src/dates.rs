//! Priority keys derived from folder names.
//!
//! Folder names carry free text with optional `YYYY-MM-DD` stamps, e.g.
//! `2015-01-01_2015-03-31_MNSC`. The first stamp decides the folder's place in
//! the processing order; names without a usable stamp sort after every dated one.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use time::{Date, Month};
use tracing::warn;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})-([0-9]{2})-([0-9]{2})").expect("static date regex"));

/// Date reported for folders without a usable stamp.
pub const SENTINEL_DATE: Date = match Date::from_calendar_date(1900, Month::January, 1) {
    Ok(d) => d,
    Err(_) => panic!("sentinel date is a valid calendar date"),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityKey {
    Dated(Date),
    Unknown,
}

impl PriorityKey {
    /// The calendar date behind the key; `SENTINEL_DATE` when unknown.
    pub fn date(&self) -> Date {
        match self {
            PriorityKey::Dated(d) => *d,
            PriorityKey::Unknown => SENTINEL_DATE,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PriorityKey::Unknown)
    }
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PriorityKey::Dated(a), PriorityKey::Dated(b)) => a.cmp(b),
            (PriorityKey::Dated(_), PriorityKey::Unknown) => Ordering::Greater,
            (PriorityKey::Unknown, PriorityKey::Dated(_)) => Ordering::Less,
            (PriorityKey::Unknown, PriorityKey::Unknown) => Ordering::Equal,
        }
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PriorityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityKey::Dated(d) => write!(f, "{d}"),
            PriorityKey::Unknown => f.write_str("unknown"),
        }
    }
}

/// Derive the priority key for a folder name.
///
/// Only the leftmost `YYYY-MM-DD` match is considered. If it is not a real
/// calendar date (e.g. `2099-13-40`) the folder is treated as undated; later
/// matches are not tried.
pub fn extract_priority(folder_name: &str) -> PriorityKey {
    let Some(caps) = DATE_RE.captures(folder_name) else {
        warn!("no date found in folder name {folder_name:?}; it will be processed last");
        return PriorityKey::Unknown;
    };

    match parse_ymd(&caps[1], &caps[2], &caps[3]) {
        Some(d) => PriorityKey::Dated(d),
        None => {
            warn!(
                "folder name {folder_name:?} has an invalid date {:?}; it will be processed last",
                &caps[0]
            );
            PriorityKey::Unknown
        }
    }
}

fn parse_ymd(y: &str, m: &str, d: &str) -> Option<Date> {
    let year: i32 = y.parse().ok()?;
    let month: u8 = m.parse().ok()?;
    let day: u8 = d.parse().ok()?;
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}
