//! Tabular result sets and their decoding into [`CrashRecord`]s.
//!
//! Every record source (warehouse query, CSV export) produces a [`Table`]
//! of loosely typed cells. Decoding is shared so that null handling is the
//! same whichever source the rows came from.

use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;
use crate::record::{CrashRecord, columns, parse_timestamp};

/// Column names plus rows of JSON cells, in result-set order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Index of the column named exactly `name`.
    pub fn column(&self, name: &str) -> Result<usize, SourceError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SourceError::MissingColumn(name.to_string()))
    }

    /// Text of the cell at (`row`, `column`), `None` when null or blank.
    pub fn text(&self, row: usize, column: usize) -> Option<String> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(cell_text)
    }
}

/// Renders a scalar cell as text. Nulls, blanks and nested values yield `None`.
pub fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_count(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    // FLOAT columns carry counts as "2.0"
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u32)
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

struct ColumnIndex {
    collision_type: usize,
    crash_datetime: usize,
    fatal_injuries: usize,
    minor_injuries: usize,
    severe_injuries: usize,
    latitude: usize,
    longitude: usize,
    weather: usize,
    roadway_surface: usize,
    lighting: usize,
    primary_collision_factor: usize,
}

impl ColumnIndex {
    fn resolve(table: &Table) -> Result<Self, SourceError> {
        Ok(Self {
            collision_type: table.column(columns::COLLISION_TYPE)?,
            crash_datetime: table.column(columns::CRASH_DATETIME)?,
            fatal_injuries: table.column(columns::FATAL_INJURIES)?,
            minor_injuries: table.column(columns::MINOR_INJURIES)?,
            severe_injuries: table.column(columns::SEVERE_INJURIES)?,
            latitude: table.column(columns::LATITUDE)?,
            longitude: table.column(columns::LONGITUDE)?,
            weather: table.column(columns::WEATHER)?,
            roadway_surface: table.column(columns::ROADWAY_SURFACE)?,
            lighting: table.column(columns::LIGHTING)?,
            primary_collision_factor: table.column(columns::PRIMARY_COLLISION_FACTOR)?,
        })
    }
}

/// Decodes every row of `table` into a [`CrashRecord`].
///
/// A missing column is an error. A malformed cell decodes as null so the
/// record is only dropped from the views that need that attribute.
pub fn decode_records(table: &Table) -> Result<Vec<CrashRecord>, SourceError> {
    let idx = ColumnIndex::resolve(table)?;
    let mut malformed = 0usize;

    let records = (0..table.rows.len())
        .map(|row| {
            let text = |column: usize| table.text(row, column);
            let mut count = |column: usize| {
                let raw = text(column)?;
                let parsed = parse_count(&raw);
                if parsed.is_none() {
                    malformed += 1;
                }
                parsed
            };

            let fatal_injuries = count(idx.fatal_injuries);
            let minor_injuries = count(idx.minor_injuries);
            let severe_injuries = count(idx.severe_injuries);

            CrashRecord {
                collision_type: text(idx.collision_type),
                crash_datetime: text(idx.crash_datetime).and_then(|raw| parse_timestamp(&raw)),
                fatal_injuries,
                minor_injuries,
                severe_injuries,
                latitude: text(idx.latitude).and_then(|raw| parse_float(&raw)),
                longitude: text(idx.longitude).and_then(|raw| parse_float(&raw)),
                weather: text(idx.weather),
                roadway_surface: text(idx.roadway_surface),
                lighting: text(idx.lighting),
                primary_collision_factor: text(idx.primary_collision_factor),
            }
        })
        .collect::<Vec<_>>();

    if malformed > 0 {
        debug!(malformed, "Injury counts that could not be parsed were treated as null");
    }

    Ok(records)
}
