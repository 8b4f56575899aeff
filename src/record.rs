//! Raw collected rows and the vocabulary used to classify them.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row of a downloaded dataset.
///
/// Only the three columns the chart needs are kept; `title`, `link` and
/// `search_word` are ignored by the CSV reader. Missing columns come through
/// as empty strings and are filtered out during aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawRecord {
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sentiment: String,
}

impl RawRecord {
    pub fn new(datetime: &str, category: &str, sentiment: &str) -> Self {
        Self {
            datetime: datetime.to_string(),
            category: category.to_string(),
            sentiment: sentiment.to_string(),
        }
    }

    /// Case-insensitive, whitespace-tolerant category match.
    pub fn is_category(&self, target: &str) -> bool {
        self.category.trim().eq_ignore_ascii_case(target.trim())
    }
}

/// The two news sections charted side by side.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, clap::ValueEnum,
)]
pub enum Category {
    #[default]
    World,
    Business,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::World, Category::Business];

    pub fn name(self) -> &'static str {
        match self {
            Category::World => "World",
            Category::Business => "Business",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every label the collection job writes a download file for.
pub const DOWNLOAD_CATEGORIES: [&str; 9] = [
    "Fragment",
    "All",
    "World",
    "Business",
    "Technology",
    "Entertainment",
    "Sports",
    "Science",
    "Health",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Exact match on the classifier's lowercase labels. Anything else is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// Calendar month; the derived ordering is calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Month {
    Jan,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

/// Fixed render order for the chart's x axis.
pub const MONTHS: [Month; 12] = [
    Month::Jan,
    Month::Feb,
    Month::Mar,
    Month::Apr,
    Month::May,
    Month::Jun,
    Month::Jul,
    Month::Aug,
    Month::Sep,
    Month::Oct,
    Month::Nov,
    Month::Dec,
];

impl Month {
    /// `number` is 1-based, as returned by `chrono::Datelike::month`.
    pub fn from_number(number: u32) -> Option<Self> {
        number
            .checked_sub(1)
            .and_then(|idx| MONTHS.get(idx as usize).copied())
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Month::Jan => "Jan",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Apr => "Apr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Aug => "Aug",
            Month::Sep => "Sep",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dec => "Dec",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MONTHS
            .iter()
            .copied()
            .find(|month| month.abbrev().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown month '{}', expected Jan..Dec", s))
    }
}

/// A parsed `datetime` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Carried an explicit offset (RFC 3339 or `+HH:MM` suffix).
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock time with no offset, as the collection job writes it.
    Naive(NaiveDateTime),
}

const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp cell, returning `None` for anything that is not a valid
/// calendar instant.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Timestamp::Zoned(dt));
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(Timestamp::Zoned(dt));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Timestamp::Naive(dt));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Timestamp::Naive)
}

/// The zone in which years and months are read off a timestamp.
///
/// `Local` follows the host's configured zone and is therefore the one
/// setting whose output can differ between machines for the same input.
/// Month names are always the English abbreviations regardless of zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportingZone {
    Utc,
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl ReportingZone {
    /// Wall-clock time of `timestamp` in this zone. Naive timestamps are taken
    /// to already be wall-clock time here and pass through unchanged.
    pub fn wall_clock(self, timestamp: Timestamp) -> NaiveDateTime {
        match timestamp {
            Timestamp::Naive(naive) => naive,
            Timestamp::Zoned(dt) => match self {
                ReportingZone::Utc => dt.with_timezone(&Utc).naive_local(),
                ReportingZone::Local => dt.with_timezone(&Local).naive_local(),
                ReportingZone::Fixed(offset) => dt.with_timezone(&offset).naive_local(),
            },
        }
    }

    /// `(year, month)` bucket coordinates, or `None` when the year does not
    /// fit the 4-digit key format.
    pub fn bucket_of(self, timestamp: Timestamp) -> Option<(String, Month)> {
        let wall = self.wall_clock(timestamp);
        if !(0..=9999).contains(&wall.year()) {
            return None;
        }
        let month = Month::from_number(wall.month())?;
        Some((format!("{:04}", wall.year()), month))
    }

    pub fn current_year(self) -> i32 {
        match self {
            ReportingZone::Utc => Utc::now().year(),
            ReportingZone::Local => Local::now().year(),
            ReportingZone::Fixed(offset) => Utc::now().with_timezone(&offset).year(),
        }
    }
}

impl fmt::Display for ReportingZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingZone::Utc => f.write_str("UTC"),
            ReportingZone::Local => f.write_str("local"),
            ReportingZone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };
    // `HH`, `HHMM` or `HH:MM`.
    let digits = match rest.split_once(':') {
        Some((hours, minutes)) if hours.len() == 2 && minutes.len() == 2 => {
            format!("{}{}", hours, minutes)
        }
        Some(_) => return None,
        None => rest.to_string(),
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
