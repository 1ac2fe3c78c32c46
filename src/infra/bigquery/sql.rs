//! Standard SQL text for the two warehouse queries.
//!
//! Identifiers come from validated configuration. User-chosen values only
//! ever travel as named parameters.

use crate::infra::bigquery::types::QueryParameter;
use crate::record::columns;
use crate::services::prediction::PredictionRequest;

/// Model output column holding the 0/1 label.
pub const PREDICTED_LABEL: &str = "predicted_is_fatal";

/// Backtick-quoted `project.dataset.name` reference.
pub fn qualified_name(project: &str, dataset: &str, name: &str) -> String {
    format!("`{project}.{dataset}.{name}`")
}

/// Selects every crash record with the fixed column list.
pub fn records_query(table: &str) -> String {
    format!("SELECT {} FROM {table}", columns::ALL.join(", "))
}

/// Runs `ML.PREDICT` on one row built from named parameters.
pub fn prediction_query(model: &str) -> String {
    format!(
        "SELECT {PREDICTED_LABEL}\n\
         FROM ML.PREDICT(MODEL {model},\n  \
         (SELECT @collision_type AS {},\n          \
         @primary_factor AS {},\n          \
         @weather AS {},\n          \
         @road_surface AS {},\n          \
         @lighting AS {},\n          \
         @minor_injuries AS {},\n          \
         @severe_injuries AS {}))",
        columns::COLLISION_TYPE,
        columns::PRIMARY_COLLISION_FACTOR,
        columns::WEATHER,
        columns::ROADWAY_SURFACE,
        columns::LIGHTING,
        columns::MINOR_INJURIES,
        columns::SEVERE_INJURIES,
    )
}

/// Parameters bound by [`prediction_query`].
pub fn prediction_parameters(request: &PredictionRequest) -> Vec<QueryParameter> {
    vec![
        QueryParameter::string("collision_type", &request.collision_type),
        QueryParameter::string("primary_factor", &request.primary_collision_factor),
        QueryParameter::string("weather", &request.weather),
        QueryParameter::string("road_surface", &request.roadway_surface),
        QueryParameter::string("lighting", &request.lighting),
        QueryParameter::int64("minor_injuries", i64::from(request.minor_injuries)),
        QueryParameter::int64("severe_injuries", i64::from(request.severe_injuries)),
    ]
}
