//! Data models for namesync
//!
//! Defines the record shape delivered by the backend (`NameRecord`), the
//! opaque identifier it carries, name validation and the read-time sort
//! modes used for display.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use icu_collator::{Collator, CollatorOptions, Strength};
use icu_locid::locale;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ValidationError;

/// Minimum number of characters a name must have after trimming
pub const MIN_NAME_CHARS: usize = 2;

/// Identifier assigned by the backend
///
/// The client never inspects or generates ids; it only compares them. The
/// backend currently sends integers, but strings are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => fmt::Display::fmt(n, f),
            RecordId::Text(s) => f.pad(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

/// A stored name as the backend reports it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NameRecord {
    /// Backend-assigned identifier, stable across snapshots
    pub id: RecordId,
    /// The name itself
    pub name: String,
    /// When the backend stored this name
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl NameRecord {
    /// Create a record (mostly useful for tests and in-memory backends)
    pub fn new(
        id: impl Into<RecordId>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
        }
    }
}

/// A full replacement image of the backend collection
pub type Snapshot = Vec<NameRecord>;

/// Trim a name and check it is long enough to be sent
///
/// Returns the trimmed name on success. Length is counted in characters.
pub fn validate_name(input: &str) -> Result<&str, ValidationError> {
    let trimmed = input.trim();
    if trimmed.chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::TooShort {
            min: MIN_NAME_CHARS,
        });
    }
    Ok(trimmed)
}

/// Parse a backend timestamp
///
/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS` form SQLite uses for
/// `CURRENT_TIMESTAMP`. Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    let rfc3339 = DateTime::parse_from_rfc3339(raw);
    if let Ok(dt) = rfc3339 {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    rfc3339.map(|dt| dt.with_timezone(&Utc))
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .map_err(|e| serde::de::Error::custom(format!("invalid created_at '{}': {}", raw, e)))
    }
}

/// How the list is ordered for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    /// Oldest first
    DateAsc,
    /// Newest first
    #[default]
    DateDesc,
    /// Alphabetical
    NameAsc,
    /// Reverse alphabetical
    NameDesc,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [
        SortMode::DateDesc,
        SortMode::DateAsc,
        SortMode::NameAsc,
        SortMode::NameDesc,
    ];

    /// The next mode in display order (wrapping)
    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Key used in config files and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::DateAsc => "date-asc",
            SortMode::DateDesc => "date-desc",
            SortMode::NameAsc => "name-asc",
            SortMode::NameDesc => "name-desc",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            SortMode::DateAsc => "By date (oldest first)",
            SortMode::DateDesc => "By date (newest first)",
            SortMode::NameAsc => "By name (A-Z)",
            SortMode::NameDesc => "By name (Z-A)",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown sort mode '{}'. Use one of: date-asc, date-desc, name-asc, name-desc",
                    s
                )
            })
    }
}

/// Return the records in display order without touching the input
///
/// The sort is stable: records with equal keys keep their snapshot order.
pub fn sort_records(records: &[NameRecord], mode: SortMode) -> Vec<&NameRecord> {
    match mode {
        SortMode::DateAsc | SortMode::DateDesc => {
            let mut sorted: Vec<&NameRecord> = records.iter().collect();
            if mode == SortMode::DateAsc {
                sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            } else {
                sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            sorted
        }
        SortMode::NameAsc | SortMode::NameDesc => {
            let collator = NameCollator::new();
            let mut sorted: Vec<&NameRecord> = records.iter().collect();
            if mode == SortMode::NameAsc {
                sorted.sort_by(|a, b| collator.compare(&a.name, &b.name));
            } else {
                sorted.sort_by(|a, b| collator.compare(&b.name, &a.name));
            }
            sorted
        }
    }
}

/// Locale-aware name comparison (`ru` tailoring, tertiary strength)
///
/// Cyrillic sorts before Latin, accents and case only break ties, and lower
/// case comes before upper case. Falls back to code point order if the
/// collation data cannot be loaded.
struct NameCollator {
    collator: Option<Collator>,
}

impl NameCollator {
    fn new() -> Self {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);

        let collator = match Collator::try_new(&locale!("ru").into(), options) {
            Ok(collator) => Some(collator),
            Err(e) => {
                warn!("Russian collation unavailable, sorting names by code point: {}", e);
                None
            }
        };
        Self { collator }
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.cmp(b),
        }
    }
}
