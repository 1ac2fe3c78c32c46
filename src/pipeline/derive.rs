use serde::Serialize;

use crate::pipeline::filter::filter;
use crate::pipeline::summary::{Summary, summarize};
use crate::pipeline::views::{
    CategoryCount, Coordinate, TimeSeries, centroid, coordinates, time_series, top_categories,
};
use crate::record::{CrashRecord, FilterCriteria};

/// Everything the dashboard displays for one filter selection.
///
/// Every view is computed from `filtered`, never from the raw record set.
#[derive(Debug, Serialize)]
pub struct Views<'a> {
    pub criteria: FilterCriteria,
    pub filtered: Vec<&'a CrashRecord>,
    pub summary: Summary,
    pub top_categories: Vec<CategoryCount>,
    pub time_series: TimeSeries,
    pub coordinates: Vec<Coordinate>,
    pub centroid: Option<Coordinate>,
}

impl Views<'_> {
    /// True when the selection matched nothing.
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Filters `records` by `criteria` and derives all views from the result.
pub fn derive_views<'a>(
    records: &'a [CrashRecord],
    criteria: &FilterCriteria,
    top_n: usize,
) -> Views<'a> {
    let filtered = filter(records, criteria);
    let points = coordinates(&filtered);

    Views {
        criteria: criteria.clone(),
        summary: summarize(&filtered),
        top_categories: top_categories(&filtered, top_n),
        time_series: time_series(&filtered),
        centroid: centroid(&filtered),
        coordinates: points,
        filtered,
    }
}
