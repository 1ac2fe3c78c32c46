//! Aggregate views derived from the filtered record subset.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::pipeline::utility::mean;
use crate::record::{CrashRecord, YearMonth};

/// Default length of the collision-type ranking.
pub const DEFAULT_TOP_N: usize = 5;

/// One entry of the collision-type ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// Crash counts per calendar month, iterated chronologically.
pub type TimeSeries = BTreeMap<YearMonth, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Ranks collision types by frequency, most frequent first.
///
/// Ties keep first-seen order. Records without a collision type are not
/// counted. At most `n` entries are returned.
pub fn top_categories(filtered: &[&CrashRecord], n: usize) -> Vec<CategoryCount> {
    let mut ranking: Vec<CategoryCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in filtered {
        let Some(category) = record.collision_type.as_deref() else {
            continue;
        };
        match positions.get(category).copied() {
            Some(i) => ranking[i].count += 1,
            None => {
                positions.insert(category, ranking.len());
                ranking.push(CategoryCount {
                    category: category.to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable: equal counts stay in first-seen order
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking.truncate(n);
    ranking
}

/// Counts crashes per year-month. Only months with at least one crash appear.
pub fn time_series(filtered: &[&CrashRecord]) -> TimeSeries {
    let mut series = TimeSeries::new();
    for bucket in filtered.iter().filter_map(|r| r.year_month()) {
        *series.entry(bucket).or_default() += 1;
    }
    series
}

/// Coordinates of every record that has both latitude and longitude.
pub fn coordinates(filtered: &[&CrashRecord]) -> Vec<Coordinate> {
    filtered
        .iter()
        .filter_map(|r| r.coordinate())
        .map(|(lat, lon)| Coordinate { lat, lon })
        .collect()
}

/// Map centre for the heatmap.
///
/// Latitude and longitude are averaged independently, each over the records
/// where that column is present, so a row missing one half still counts for
/// the other. `None` when either column has no values.
pub fn centroid(filtered: &[&CrashRecord]) -> Option<Coordinate> {
    let column_mean = |extract: fn(&CrashRecord) -> Option<f64>| {
        let values: Vec<f64> = filtered
            .iter()
            .filter_map(|r| extract(r))
            .filter(|v| v.is_finite())
            .collect();
        (!values.is_empty()).then(|| mean(&values))
    };
    Some(Coordinate {
        lat: column_mean(|r| r.latitude)?,
        lon: column_mean(|r| r.longitude)?,
    })
}
