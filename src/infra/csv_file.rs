//! Crash records from a local CSV export of the warehouse table.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::SourceError;
use crate::record::CrashRecord;
use crate::services::record_source::RecordSource;
use crate::table::{Table, decode_records};

/// Reads a CSV whose header row uses the warehouse column names.
pub struct CsvRecordSource {
    path: PathBuf,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Loads a CSV file into a [`Table`]. Empty fields become nulls.
pub fn read_table(path: &Path) -> Result<Table, SourceError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let columns = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Value::Null
                    } else {
                        Value::String(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Table { columns, rows })
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_records(&self) -> Result<Vec<CrashRecord>, SourceError> {
        let table = read_table(&self.path)?;
        let records = decode_records(&table)?;
        info!(records = records.len(), "Crash records loaded from CSV");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("csv {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    const HEADER: &str = "COLLISIONTYPE,CRASHDATETIME,FATALINJURIES,MINORINJURIES,\
                          SEVEREINJURIES,LATITUDE,LONGITUDE,WEATHER,ROADWAYSURFACE,\
                          LIGHTING,PRIMARYCOLLISIONFACTOR";

    #[tokio::test]
    async fn test_fetch_records_from_csv() {
        let path = temp_path("crash_dash_test_source.csv");
        fs::write(
            &path,
            format!(
                "{HEADER}\n\
                 Rear End,2020-01-15T08:00:00,0,1,0,37.33,-121.89,Clear,Dry,Daylight,Unsafe Speed\n\
                 Broadside,2021-02-01 10:00:00,,0,0,,,Rain,Wet,Dark,Red Signal\n"
            ),
        )
        .unwrap();

        let source = CsvRecordSource::new(&path);
        let records = source.fetch_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].year(), Some(2020));
        assert_eq!(records[0].coordinate(), Some((37.33, -121.89)));
        assert_eq!(records[1].fatal_injuries, None);
        assert_eq!(records[1].coordinate(), None);
        assert_eq!(records[1].weather.as_deref(), Some("Rain"));

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_column_in_csv() {
        let path = temp_path("crash_dash_test_bad_header.csv");
        fs::write(&path, "COLLISIONTYPE,CRASHDATETIME\nRear End,2020-01-01\n").unwrap();

        let result = CsvRecordSource::new(&path).fetch_records().await;
        assert!(matches!(result, Err(SourceError::MissingColumn(_))));

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = CsvRecordSource::new("/nonexistent/crash_dash.csv")
            .fetch_records()
            .await;
        assert!(result.is_err());
    }
}
