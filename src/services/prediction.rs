//! Trait and types for the remote crash-severity model.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PredictionError;
use crate::pipeline::options::PredictionOptions;

/// Largest injury count the model accepts as input.
pub const MAX_INJURY_INPUT: u32 = 10;

/// Feature values passed verbatim to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionRequest {
    pub collision_type: String,
    pub primary_collision_factor: String,
    pub weather: String,
    pub roadway_surface: String,
    pub lighting: String,
    pub minor_injuries: u32,
    pub severe_injuries: u32,
}

impl PredictionRequest {
    /// Rejects blank categories and injury counts above [`MAX_INJURY_INPUT`].
    pub fn validate(&self) -> Result<(), PredictionError> {
        let categories = [
            ("collision type", &self.collision_type),
            ("primary collision factor", &self.primary_collision_factor),
            ("weather", &self.weather),
            ("roadway surface", &self.roadway_surface),
            ("lighting", &self.lighting),
        ];
        for (name, value) in categories {
            if value.trim().is_empty() {
                return Err(PredictionError::InvalidInput(format!("{name} is empty")));
            }
        }

        for (name, value) in [
            ("minor injuries", self.minor_injuries),
            ("severe injuries", self.severe_injuries),
        ] {
            if value > MAX_INJURY_INPUT {
                return Err(PredictionError::InvalidInput(format!(
                    "{name} must be between 0 and {MAX_INJURY_INPUT}, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Names of features whose value never occurs in `options`.
    ///
    /// The model was trained on the warehouse values, so unseen categories
    /// are worth a warning even though the request is still valid.
    pub fn unseen_features(&self, options: &PredictionOptions) -> Vec<&'static str> {
        let checks: [(&'static str, &String, &Vec<String>); 5] = [
            ("collision type", &self.collision_type, &options.collision_types),
            (
                "primary collision factor",
                &self.primary_collision_factor,
                &options.primary_factors,
            ),
            ("weather", &self.weather, &options.weather),
            ("roadway surface", &self.roadway_surface, &options.road_surfaces),
            ("lighting", &self.lighting, &options.lighting),
        ];
        checks
            .into_iter()
            .filter(|(_, value, known)| !known.contains(value))
            .map(|(name, _, _)| name)
            .collect()
    }
}

/// Binary model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeverityPrediction {
    Fatal,
    NonFatal,
}

impl SeverityPrediction {
    /// Interprets the model label: `1` is fatal, `0` is non-fatal.
    pub fn from_label(label: &str) -> Result<Self, PredictionError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" => Ok(SeverityPrediction::Fatal),
            "0" | "0.0" | "false" => Ok(SeverityPrediction::NonFatal),
            other => Err(PredictionError::UnexpectedLabel(other.to_string())),
        }
    }
}

impl fmt::Display for SeverityPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeverityPrediction::Fatal => "Fatal",
            SeverityPrediction::NonFatal => "Non-Fatal",
        })
    }
}

/// Abstraction over a severity model endpoint.
#[async_trait]
pub trait SeverityPredictor: Send + Sync {
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<SeverityPrediction, PredictionError>;
}
