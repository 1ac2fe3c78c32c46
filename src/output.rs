//! Display sinks for the derived views.
//!
//! Supports terminal tables and bar charts, JSON, CSV export of the
//! filtered rows, and a GeoJSON point layer for heatmap tools.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::pipeline::Views;
use crate::pipeline::options::{FilterOptions, YearSelector};
use crate::pipeline::summary::Summary;
use crate::pipeline::views::{CategoryCount, Coordinate, TimeSeries};
use crate::record::CrashRecord;

const BAR_WIDTH: usize = 40;

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max);
    "#".repeat(len)
}

fn stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

/// Writes the descriptive statistics table.
pub fn write_summary(w: &mut impl Write, summary: &Summary) -> Result<()> {
    writeln!(w, "Crash Data Overview ({} records)", summary.records)?;
    writeln!(
        w,
        "{:<16} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    )?;
    for c in &summary.columns {
        writeln!(
            w,
            "{:<16} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            c.column,
            c.count,
            stat(c.mean),
            stat(c.std),
            stat(c.min),
            stat(c.p25),
            stat(c.median),
            stat(c.p75),
            stat(c.max)
        )?;
    }
    Ok(())
}

/// Writes the collision-type ranking as horizontal bars.
pub fn write_ranking(w: &mut impl Write, ranking: &[CategoryCount]) -> Result<()> {
    writeln!(w, "Top {} Collision Types", ranking.len())?;
    if ranking.is_empty() {
        writeln!(w, "  (nothing to show)")?;
        return Ok(());
    }
    let width = ranking.iter().map(|c| c.category.len()).max().unwrap_or(0);
    let max = ranking.iter().map(|c| c.count).max().unwrap_or(0);
    for c in ranking {
        writeln!(
            w,
            "  {:<width$} {:>7} {}",
            c.category,
            c.count,
            bar(c.count, max)
        )?;
    }
    Ok(())
}

/// Writes crashes per month, oldest first.
pub fn write_time_series(w: &mut impl Write, series: &TimeSeries) -> Result<()> {
    writeln!(w, "Crashes Over Time")?;
    if series.is_empty() {
        writeln!(w, "  (nothing to show)")?;
        return Ok(());
    }
    let max = series.values().copied().max().unwrap_or(0);
    for (month, count) in series {
        writeln!(w, "  {month} {count:>7} {}", bar(*count, max))?;
    }
    Ok(())
}

/// Writes the heatmap point count and centre.
pub fn write_locations(
    w: &mut impl Write,
    points: &[Coordinate],
    center: Option<Coordinate>,
) -> Result<()> {
    writeln!(w, "Crash Locations")?;
    match center {
        Some(c) => writeln!(
            w,
            "  {} points, centred at ({:.5}, {:.5})",
            points.len(),
            c.lat,
            c.lon
        )?,
        None => writeln!(w, "  (nothing to show)")?,
    }
    Ok(())
}

/// Writes every view for one selection.
pub fn write_views(w: &mut impl Write, views: &Views<'_>) -> Result<()> {
    writeln!(w, "Filters: {}", views.criteria)?;
    writeln!(w)?;
    write_summary(w, &views.summary)?;
    writeln!(w)?;
    write_ranking(w, &views.top_categories)?;
    writeln!(w)?;
    write_time_series(w, &views.time_series)?;
    writeln!(w)?;
    write_locations(w, &views.coordinates, views.centroid)?;
    Ok(())
}

/// Writes the available filter choices.
pub fn write_filter_options(w: &mut impl Write, options: &FilterOptions) -> Result<()> {
    match options.years {
        YearSelector::Range { min, max } => writeln!(w, "Years: {min}..{max}")?,
        YearSelector::Single { year } => writeln!(w, "Years: only data from {year} is available")?,
        YearSelector::Empty => writeln!(w, "Years: no dated records")?,
    }
    writeln!(w, "Collision types:")?;
    writeln!(w, "  All")?;
    for name in &options.collision_types {
        writeln!(w, "  {name}")?;
    }
    Ok(())
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json(w: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

/// Writes the filtered rows to a CSV file with warehouse column headers.
///
/// Replaces any existing file.
pub fn export_records(path: &Path, records: &[&CrashRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "Filtered records exported");
    Ok(())
}

/// Writes `points` as a GeoJSON FeatureCollection of points.
pub fn write_heatmap_geojson(path: &Path, points: &[Coordinate]) -> Result<()> {
    let features: Vec<_> = points
        .iter()
        .map(|p| {
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [p.lon, p.lat] },
                "properties": {}
            })
        })
        .collect();
    let collection = json!({ "type": "FeatureCollection", "features": features });

    let file = std::fs::File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), &collection)?;
    debug!(path = %path.display(), points = points.len(), "Heatmap layer written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::derive_views;
    use crate::pipeline::views::DEFAULT_TOP_N;
    use crate::pipeline::views::testing::{crash, located};
    use crate::record::FilterCriteria;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(10, 10).len(), BAR_WIDTH);
        assert_eq!(bar(5, 10).len(), BAR_WIDTH / 2);
        assert_eq!(bar(1, 1000).len(), 1);
    }

    #[test]
    fn test_write_views_renders_every_section() {
        let records = vec![
            located(crash("Rear End", "2020-01-15T08:00:00", 0), 37.3, -121.9),
            crash("Broadside", "2020-03-09T12:00:00", 0),
        ];
        let views = derive_views(&records, &FilterCriteria::default(), DEFAULT_TOP_N);
        let out = render(|w| write_views(w, &views));

        assert!(out.contains("Filters: type=All years=all severity=all"));
        assert!(out.contains("Crash Data Overview (2 records)"));
        assert!(out.contains("FATALINJURIES"));
        assert!(out.contains("25%"));
        assert!(out.lines().any(|l| l.starts_with("Year") && l.contains("2020.000")));
        assert!(out.contains("Top 2 Collision Types"));
        assert!(out.contains("2020-01"));
        assert!(out.contains("2020-03"));
        assert!(out.contains("1 points, centred at (37.30000, -121.90000)"));
    }

    #[test]
    fn test_empty_views_render_nothing_to_show() {
        let views = derive_views(&[], &FilterCriteria::default(), DEFAULT_TOP_N);
        let out = render(|w| write_views(w, &views));
        assert_eq!(out.matches("(nothing to show)").count(), 3);
    }

    #[test]
    fn test_write_filter_options() {
        let options = FilterOptions {
            years: YearSelector::Single { year: 2021 },
            collision_types: vec!["Rear End".to_string()],
        };
        let out = render(|w| write_filter_options(w, &options));
        assert!(out.contains("only data from 2021"));
        assert!(out.contains("  All\n  Rear End\n"));
    }

    #[test]
    fn test_export_records_overwrites_with_header() {
        let path = temp_path("crash_dash_test_export.csv");
        let records = vec![crash("Rear End", "2020-01-15T08:00:00", 0)];
        let refs: Vec<&CrashRecord> = records.iter().collect();

        export_records(&path, &refs).unwrap();
        export_records(&path, &refs).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("COLLISIONTYPE,CRASHDATETIME,FATALINJURIES"));
        assert!(lines[1].starts_with("Rear End,2020-01-15T08:00:00,0,"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_heatmap_geojson_uses_lon_lat_order() {
        let path = temp_path("crash_dash_test_heatmap.geojson");
        let points = vec![Coordinate {
            lat: 37.3,
            lon: -121.9,
        }];
        write_heatmap_geojson(&path, &points).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"],
            json!([-121.9, 37.3])
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json() {
        let out = render(|w| write_json(w, &json!({ "a": 1 })));
        assert!(out.ends_with("}\n"));
    }
}
