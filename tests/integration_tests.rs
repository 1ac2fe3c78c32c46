use std::path::PathBuf;

use crash_dash::dashboard::{Dashboard, InputEvent};
use crash_dash::infra::csv_file::CsvRecordSource;
use crash_dash::pipeline::options::{PredictionOptions, YearSelector};
use crash_dash::pipeline::views::DEFAULT_TOP_N;
use crash_dash::pipeline::{derive_views, filter};
use crash_dash::record::{CollisionFilter, FilterCriteria, Severity, YearMonth, YearRange};
use crash_dash::services::prediction::PredictionRequest;
use crash_dash::services::record_source::RecordSource;
use crash_dash::session::RecordCache;

const HEADER: &str = "COLLISIONTYPE,CRASHDATETIME,FATALINJURIES,MINORINJURIES,\
                      SEVEREINJURIES,LATITUDE,LONGITUDE,WEATHER,ROADWAYSURFACE,LIGHTING,\
                      PRIMARYCOLLISIONFACTOR\n";

const ROWS: &str = "\
Rear End,2020-01-15T08:00:00,0,1,0,37.30,-121.90,Clear,Dry,Daylight,Unsafe Speed
Rear End,2021-06-02T17:30:00,1,0,1,37.34,-121.88,Clear,Dry,Dusk,Unsafe Speed
Broadside,2020-03-09 12:00:00,0,2,0,,,Rain,Wet,Daylight,Red Signal
Head-On,,0,0,0,37.32,-121.86,Fog,Wet,Dark,Wrong Side
";

fn sample() -> String {
    format!("{HEADER}{ROWS}")
}

fn write_fixture(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

#[tokio::test]
async fn test_full_pipeline_from_csv() {
    let path = write_fixture("crash_dash_it_pipeline.csv", &sample());
    let records = CsvRecordSource::new(&path)
        .fetch_records()
        .await
        .expect("Failed to load records");
    assert_eq!(records.len(), 4);

    let criteria = FilterCriteria {
        collision_type: CollisionFilter::Only("Rear End".to_string()),
        years: Some(YearRange::new(2020, 2021).unwrap()),
        severity: Severity::All,
    };
    let views = derive_views(&records, &criteria, DEFAULT_TOP_N);

    assert_eq!(views.filtered.len(), 2);
    assert_eq!(views.top_categories.len(), 1);
    assert_eq!(views.top_categories[0].category, "Rear End");
    assert_eq!(views.top_categories[0].count, 2);
    assert_eq!(
        views.time_series.keys().copied().collect::<Vec<_>>(),
        vec![
            YearMonth { year: 2020, month: 1 },
            YearMonth { year: 2021, month: 6 },
        ]
    );
    assert_eq!(views.coordinates.len(), 2);
    assert_eq!(views.summary.records, 2);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_severity_and_null_handling() {
    let path = write_fixture("crash_dash_it_nulls.csv", &sample());
    let records = CsvRecordSource::new(&path).fetch_records().await.unwrap();

    let fatal = FilterCriteria {
        severity: Severity::Fatal,
        ..Default::default()
    };
    assert_eq!(filter(&records, &fatal).len(), 1);

    // The undated Head-On crash has no year, so any explicit range drops it.
    let ranged = FilterCriteria {
        years: Some(YearRange::new(2000, 2100).unwrap()),
        ..Default::default()
    };
    assert_eq!(filter(&records, &ranged).len(), 3);
    assert_eq!(filter(&records, &FilterCriteria::default()).len(), 4);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_dashboard_session_over_csv() {
    let path = write_fixture("crash_dash_it_session.csv", &sample());
    let cache = RecordCache::new(CsvRecordSource::new(&path), None);
    let mut dash = Dashboard::new(cache, DEFAULT_TOP_N);

    let options = dash.filter_options().await.unwrap();
    assert_eq!(options.years, YearSelector::Range { min: 2020, max: 2021 });
    assert_eq!(options.collision_types, vec!["Rear End", "Broadside", "Head-On"]);

    let views = dash.views().await.unwrap();
    assert_eq!(views.filtered.len(), 3);

    let views = dash
        .apply("type Broadside".parse::<InputEvent>().unwrap())
        .await
        .unwrap();
    assert_eq!(views.filtered.len(), 1);
    assert!(views.coordinates.is_empty());
    assert_eq!(views.centroid, None);

    let views = dash
        .apply("severity fatal".parse::<InputEvent>().unwrap())
        .await
        .unwrap();
    assert!(views.is_empty());
    assert!(views.top_categories.is_empty());
    assert!(views.time_series.is_empty());

    let views = dash.apply(InputEvent::Reset).await.unwrap();
    assert_eq!(views.filtered.len(), 3);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_prediction_inputs_follow_filters() {
    let path = write_fixture("crash_dash_it_predict.csv", &sample());
    let records = CsvRecordSource::new(&path).fetch_records().await.unwrap();
    let criteria = FilterCriteria {
        collision_type: CollisionFilter::Only("Rear End".to_string()),
        ..Default::default()
    };
    let options = PredictionOptions::from_records(&filter(&records, &criteria));
    assert_eq!(options.collision_types, vec!["Rear End"]);
    assert_eq!(options.lighting, vec!["Daylight", "Dusk"]);

    let request = PredictionRequest {
        collision_type: "Rear End".to_string(),
        primary_collision_factor: "Unsafe Speed".to_string(),
        weather: "Snow".to_string(),
        roadway_surface: "Dry".to_string(),
        lighting: "Daylight".to_string(),
        minor_injuries: 0,
        severe_injuries: 0,
    };
    request.validate().unwrap();
    assert_eq!(request.unseen_features(&options), vec!["weather"]);

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn test_empty_dataset_yields_empty_views() {
    let path = write_fixture("crash_dash_it_empty.csv", HEADER);
    let cache = RecordCache::new(CsvRecordSource::new(&path), None);
    let mut dash = Dashboard::new(cache, DEFAULT_TOP_N);

    let options = dash.filter_options().await.unwrap();
    assert_eq!(options.years, YearSelector::Empty);

    let views = dash.views().await.unwrap();
    assert!(views.is_empty());
    assert!(views.top_categories.is_empty());
    assert!(views.time_series.is_empty());
    assert!(views.coordinates.is_empty());
    assert_eq!(views.centroid, None);

    std::fs::remove_file(&path).unwrap();
}
