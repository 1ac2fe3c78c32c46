//! Choices offered to the user, derived from the loaded records.

use std::collections::HashSet;

use serde::Serialize;

use crate::record::{CrashRecord, FilterCriteria, YearRange};

/// The year control a dataset supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YearSelector {
    /// No record has a usable timestamp.
    Empty,
    /// Only one distinct year: shown as a constant, not a range.
    Single { year: i32 },
    Range { min: i32, max: i32 },
}

impl YearSelector {
    /// Year constraint that keeps the whole dataset.
    ///
    /// Single-year and undated datasets get no constraint at all, so records
    /// without a timestamp are not dropped when no range can be chosen.
    pub fn full_range(&self) -> Option<YearRange> {
        match *self {
            YearSelector::Range { min, max } => YearRange::new(min, max).ok(),
            YearSelector::Single { .. } | YearSelector::Empty => None,
        }
    }

    /// Criteria that select every record.
    pub fn default_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            years: self.full_range(),
            ..Default::default()
        }
    }
}

/// Builds the year selector from the full (unfiltered) record set.
pub fn year_selector(records: &[CrashRecord]) -> YearSelector {
    let mut years = records.iter().filter_map(CrashRecord::year);
    let Some(first) = years.next() else {
        return YearSelector::Empty;
    };
    let (min, max) = years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if min == max {
        YearSelector::Single { year: min }
    } else {
        YearSelector::Range { min, max }
    }
}

/// Distinct non-null values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .flatten()
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Filter choices: year control plus collision types (listed after "All").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub years: YearSelector,
    pub collision_types: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[CrashRecord]) -> Self {
        Self {
            years: year_selector(records),
            collision_types: distinct(records.iter().map(|r| r.collision_type.as_deref())),
        }
    }
}

/// Values offered for each categorical prediction feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionOptions {
    pub collision_types: Vec<String>,
    pub primary_factors: Vec<String>,
    pub weather: Vec<String>,
    pub road_surfaces: Vec<String>,
    pub lighting: Vec<String>,
}

impl PredictionOptions {
    pub fn from_records(records: &[&CrashRecord]) -> Self {
        Self {
            collision_types: distinct(records.iter().map(|r| r.collision_type.as_deref())),
            primary_factors: distinct(
                records
                    .iter()
                    .map(|r| r.primary_collision_factor.as_deref()),
            ),
            weather: distinct(records.iter().map(|r| r.weather.as_deref())),
            road_surfaces: distinct(records.iter().map(|r| r.roadway_surface.as_deref())),
            lighting: distinct(records.iter().map(|r| r.lighting.as_deref())),
        }
    }
}
