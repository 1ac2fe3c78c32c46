//! Descriptive statistics over the numeric columns of the filtered records.

use serde::Serialize;

use crate::pipeline::utility::{mean, quantile, sample_stddev};
use crate::record::{CrashRecord, columns};

/// Statistics for one numeric column. Nulls are skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn from_values(column: &'static str, values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                column,
                count: 0,
                mean: None,
                std: None,
                min: None,
                p25: None,
                median: None,
                p75: None,
                max: None,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let avg = mean(values);
        Self {
            column,
            count: values.len(),
            mean: Some(avg),
            std: sample_stddev(values, avg),
            min: sorted.first().copied(),
            p25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub columns: Vec<ColumnSummary>,
}

type Extractor = fn(&CrashRecord) -> Option<f64>;

/// Label of the crash-year row, derived from `CRASHDATETIME`.
pub const YEAR_COLUMN: &str = "Year";

const NUMERIC_COLUMNS: &[(&str, Extractor)] = &[
    (columns::FATAL_INJURIES, |r| r.fatal_injuries.map(f64::from)),
    (columns::MINOR_INJURIES, |r| r.minor_injuries.map(f64::from)),
    (columns::SEVERE_INJURIES, |r| r.severe_injuries.map(f64::from)),
    (columns::LATITUDE, |r| r.latitude),
    (columns::LONGITUDE, |r| r.longitude),
    (YEAR_COLUMN, |r| r.year().map(f64::from)),
];

/// Summarizes the numeric columns of `filtered`.
pub fn summarize(filtered: &[&CrashRecord]) -> Summary {
    let columns = NUMERIC_COLUMNS
        .iter()
        .map(|&(name, extract)| {
            let values: Vec<f64> = filtered.iter().filter_map(|r| extract(r)).collect();
            ColumnSummary::from_values(name, &values)
        })
        .collect();

    Summary {
        records: filtered.len(),
        columns,
    }
}
