//! CLI entry point for the crash analysis dashboard.
//!
//! Provides subcommands for printing the filtered overview, listing the
//! available filter choices, asking the severity model for a prediction,
//! and exploring the data interactively.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crash_dash::dashboard::{Dashboard, InputEvent};
use crash_dash::infra::bigquery::BigQueryClient;
use crash_dash::infra::config::{WarehouseSettings, cache_ttl};
use crash_dash::infra::csv_file::CsvRecordSource;
use crash_dash::output;
use crash_dash::pipeline::views::DEFAULT_TOP_N;
use crash_dash::record::{CollisionFilter, Severity, YearRange};
use crash_dash::services::prediction::{PredictionRequest, SeverityPredictor};
use crash_dash::services::record_source::RecordSource;
use crash_dash::session::RecordCache;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "crash_dash")]
#[command(about = "Explore city crash records and predict crash severity", long_about = None)]
struct Cli {
    /// Read records from a CSV export instead of BigQuery
    #[arg(short, long, global = true, value_name = "CSV")]
    input: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print statistics, top collision types, crashes over time and locations
    Summary {
        /// Collision type to keep, or "all"
        #[arg(short = 't', long, default_value = "all")]
        collision_type: CollisionFilter,

        /// Inclusive year range such as 2019..2021 (default: every year in the data)
        #[arg(short, long)]
        years: Option<YearRange>,

        /// all, fatal or non-fatal
        #[arg(short, long, default_value = "all")]
        severity: Severity,

        /// Number of collision types to rank
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,

        /// Print the views as JSON instead of tables
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the crash locations as GeoJSON points to this file
        #[arg(long)]
        heatmap: Option<PathBuf>,

        /// Write the filtered records as CSV to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// List the years and collision types available for filtering
    Options {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Predict whether a crash with the given features is fatal
    Predict {
        #[arg(long)]
        collision_type: String,

        #[arg(long)]
        primary_factor: String,

        #[arg(long)]
        weather: String,

        #[arg(long)]
        road_surface: String,

        #[arg(long)]
        lighting: String,

        #[arg(long, default_value_t = 0)]
        minor_injuries: u32,

        #[arg(long, default_value_t = 0)]
        severe_injuries: u32,
    },
    /// Change filters line by line and watch every view update
    Explore {
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
}

const EXPLORE_HELP: &str = "\
commands:
  type <name|all>        filter by collision type
  years <a..b|year|all>  filter by crash year
  severity <class>       all, fatal or non-fatal
  reset                  clear every filter
  refresh                fetch the records again
  options                list filter choices
  quit                   leave";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/crash_dash.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("crash_dash.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let ttl = cache_ttl(|name| std::env::var(name).ok())?;

    match cli.command {
        Commands::Summary {
            collision_type,
            years,
            severity,
            top,
            json,
            heatmap,
            export,
        } => {
            let cache = RecordCache::new(record_source(cli.input.as_deref())?, ttl);
            let mut dash = Dashboard::new(cache, top);

            let mut events = vec![
                InputEvent::CollisionType(collision_type),
                InputEvent::Severity(severity),
            ];
            if let Some(years) = years {
                events.push(InputEvent::Years(Some(years)));
            }
            for event in events {
                dash.select(event).await?;
            }

            let views = dash.views().await?;
            let mut stdout = std::io::stdout().lock();
            if json {
                output::write_json(&mut stdout, &views)?;
            } else {
                output::write_views(&mut stdout, &views)?;
            }

            if let Some(path) = heatmap {
                output::write_heatmap_geojson(&path, &views.coordinates)
                    .with_context(|| format!("writing heatmap to {}", path.display()))?;
                info!(path = %path.display(), points = views.coordinates.len(), "Heatmap written");
            }
            if let Some(path) = export {
                output::export_records(&path, &views.filtered)
                    .with_context(|| format!("exporting records to {}", path.display()))?;
            }
        }
        Commands::Options { json } => {
            let cache = RecordCache::new(record_source(cli.input.as_deref())?, ttl);
            let mut dash = Dashboard::new(cache, DEFAULT_TOP_N);
            let options = dash.filter_options().await?;

            let mut stdout = std::io::stdout().lock();
            if json {
                output::write_json(&mut stdout, &options)?;
            } else {
                output::write_filter_options(&mut stdout, &options)?;
            }
        }
        Commands::Predict {
            collision_type,
            primary_factor,
            weather,
            road_surface,
            lighting,
            minor_injuries,
            severe_injuries,
        } => {
            let request = PredictionRequest {
                collision_type,
                primary_collision_factor: primary_factor,
                weather,
                roadway_surface: road_surface,
                lighting,
                minor_injuries,
                severe_injuries,
            };
            request.validate()?;

            let settings = WarehouseSettings::from_env()?;
            let predictor = BigQueryClient::from_settings(settings)?;

            let cache = RecordCache::new(record_source(cli.input.as_deref())?, ttl);
            let mut dash = Dashboard::new(cache, DEFAULT_TOP_N);
            match dash.prediction_options().await {
                Ok(options) => {
                    for feature in request.unseen_features(&options) {
                        warn!(feature, "Value never occurs in the crash data");
                    }
                }
                Err(e) => warn!(error = %e, "Could not load records to check prediction inputs"),
            }

            let prediction = predictor.predict(&request).await?;
            println!("Predicted severity: {prediction}");
        }
        Commands::Explore { top } => {
            let cache = RecordCache::new(record_source(cli.input.as_deref())?, ttl);
            explore(Dashboard::new(cache, top)).await?;
        }
    }

    Ok(())
}

/// Picks the CSV export when given, otherwise the warehouse table.
fn record_source(input: Option<&Path>) -> Result<Box<dyn RecordSource>> {
    let source: Box<dyn RecordSource> = match input {
        Some(path) => Box::new(CsvRecordSource::new(path)),
        None => Box::new(BigQueryClient::from_settings(WarehouseSettings::from_env()?)?),
    };
    info!(source = %source.describe(), "Record source selected");
    Ok(source)
}

/// Reads input events from stdin and reprints the views after each one.
#[tracing::instrument(skip_all)]
async fn explore<S: RecordSource>(mut dash: Dashboard<S>) -> Result<()> {
    {
        let views = dash.views().await?;
        output::write_views(&mut std::io::stdout().lock(), &views)?;
    }
    println!("{EXPLORE_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{EXPLORE_HELP}");
                continue;
            }
            "options" => {
                let options = dash.filter_options().await?;
                output::write_filter_options(&mut std::io::stdout().lock(), &options)?;
                continue;
            }
            _ => {}
        }

        let event = match line.parse::<InputEvent>() {
            Ok(event) => event,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match dash.apply(event).await {
            Ok(views) => {
                if views.is_empty() {
                    println!("No crashes match the current filters.");
                }
                output::write_views(&mut std::io::stdout().lock(), &views)?;
            }
            Err(e) => {
                warn!(error = %e, "Could not load crash records");
                println!("Could not load crash records: {e}");
            }
        }
    }

    info!(criteria = %dash.criteria(), "Explore session finished");
    Ok(())
}
