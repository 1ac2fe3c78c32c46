//! Crash records and the filter criteria applied to them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::error::CriteriaError;

/// Warehouse column names. These must match the table schema exactly.
pub mod columns {
    pub const COLLISION_TYPE: &str = "COLLISIONTYPE";
    pub const CRASH_DATETIME: &str = "CRASHDATETIME";
    pub const FATAL_INJURIES: &str = "FATALINJURIES";
    pub const MINOR_INJURIES: &str = "MINORINJURIES";
    pub const SEVERE_INJURIES: &str = "SEVEREINJURIES";
    pub const LATITUDE: &str = "LATITUDE";
    pub const LONGITUDE: &str = "LONGITUDE";
    pub const WEATHER: &str = "WEATHER";
    pub const ROADWAY_SURFACE: &str = "ROADWAYSURFACE";
    pub const LIGHTING: &str = "LIGHTING";
    pub const PRIMARY_COLLISION_FACTOR: &str = "PRIMARYCOLLISIONFACTOR";

    pub const ALL: [&str; 11] = [
        COLLISION_TYPE,
        CRASH_DATETIME,
        FATAL_INJURIES,
        MINOR_INJURIES,
        SEVERE_INJURIES,
        LATITUDE,
        LONGITUDE,
        WEATHER,
        ROADWAY_SURFACE,
        LIGHTING,
        PRIMARY_COLLISION_FACTOR,
    ];
}

/// One crash event. Every attribute may be null in the warehouse.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrashRecord {
    #[serde(rename = "COLLISIONTYPE")]
    pub collision_type: Option<String>,
    #[serde(rename = "CRASHDATETIME")]
    pub crash_datetime: Option<NaiveDateTime>,
    #[serde(rename = "FATALINJURIES")]
    pub fatal_injuries: Option<u32>,
    #[serde(rename = "MINORINJURIES")]
    pub minor_injuries: Option<u32>,
    #[serde(rename = "SEVEREINJURIES")]
    pub severe_injuries: Option<u32>,
    #[serde(rename = "LATITUDE")]
    pub latitude: Option<f64>,
    #[serde(rename = "LONGITUDE")]
    pub longitude: Option<f64>,
    #[serde(rename = "WEATHER")]
    pub weather: Option<String>,
    #[serde(rename = "ROADWAYSURFACE")]
    pub roadway_surface: Option<String>,
    #[serde(rename = "LIGHTING")]
    pub lighting: Option<String>,
    #[serde(rename = "PRIMARYCOLLISIONFACTOR")]
    pub primary_collision_factor: Option<String>,
}

impl CrashRecord {
    pub fn year(&self) -> Option<i32> {
        self.crash_datetime.map(|dt| dt.year())
    }

    pub fn year_month(&self) -> Option<YearMonth> {
        self.crash_datetime.map(|dt| YearMonth {
            year: dt.year(),
            month: dt.month(),
        })
    }

    /// Both coordinates, when present and finite.
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a warehouse timestamp cell.
///
/// BigQuery `TIMESTAMP` values arrive as epoch seconds in a float string,
/// `DATETIME` and `STRING` columns as text. Text with a UTC offset keeps its
/// local wall-clock time. Unparseable input yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(secs) = raw.parse::<f64>() {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        return DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar month bucket. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Severity class derived from the fatal-injury count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    #[default]
    All,
    Fatal,
    NonFatal,
}

impl Severity {
    /// A null fatal count is neither fatal nor non-fatal.
    pub fn matches(self, fatal_injuries: Option<u32>) -> bool {
        match self {
            Severity::All => true,
            Severity::Fatal => matches!(fatal_injuries, Some(n) if n > 0),
            Severity::NonFatal => fatal_injuries == Some(0),
        }
    }
}

impl FromStr for Severity {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Severity::All),
            "fatal" => Ok(Severity::Fatal),
            "non-fatal" | "nonfatal" | "non_fatal" => Ok(Severity::NonFatal),
            other => Err(CriteriaError::UnknownSeverity(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::All => "all",
            Severity::Fatal => "fatal",
            Severity::NonFatal => "non-fatal",
        })
    }
}

/// Collision type selection: everything, or one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionFilter {
    #[default]
    All,
    Only(String),
}

impl CollisionFilter {
    pub fn matches(&self, collision_type: Option<&str>) -> bool {
        match self {
            CollisionFilter::All => true,
            CollisionFilter::Only(wanted) => collision_type == Some(wanted.as_str()),
        }
    }
}

impl FromStr for CollisionFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            Ok(CollisionFilter::All)
        } else {
            Ok(CollisionFilter::Only(s.to_string()))
        }
    }
}

impl fmt::Display for CollisionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionFilter::All => f.write_str("All"),
            CollisionFilter::Only(name) => f.write_str(name),
        }
    }
}

/// Inclusive year range with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Result<Self, CriteriaError> {
        if min > max {
            return Err(CriteriaError::InvertedYearRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn single(year: i32) -> Self {
        Self {
            min: year,
            max: year,
        }
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

impl FromStr for YearRange {
    type Err = CriteriaError;

    /// Accepts `2020`, `2020..2021`, `2020..=2021` or `2020-2021`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse_year = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| CriteriaError::InvalidYear(part.trim().to_string()))
        };

        let bounds = s
            .split_once("..=")
            .or_else(|| s.split_once(".."))
            .or_else(|| s.split_once('-'));

        match bounds {
            Some((min, max)) => YearRange::new(parse_year(min)?, parse_year(max)?),
            None => Ok(YearRange::single(parse_year(s)?)),
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

/// The user's current filter selection.
///
/// `years: None` applies no year constraint. That is the state when the
/// dataset spans a single year and no range selector is offered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub collision_type: CollisionFilter,
    pub years: Option<YearRange>,
    pub severity: Severity,
}

impl FilterCriteria {
    pub fn matches(&self, record: &CrashRecord) -> bool {
        self.collision_type
            .matches(record.collision_type.as_deref())
            && self
                .years
                .is_none_or(|range| record.year().is_some_and(|y| range.contains(y)))
            && self.severity.matches(record.fatal_injuries)
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type={} years=", self.collision_type)?;
        match &self.years {
            Some(range) => write!(f, "{range}")?,
            None => f.write_str("all")?,
        }
        write!(f, " severity={}", self.severity)
    }
}
