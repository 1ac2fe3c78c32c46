//! Thin controller: turns user input events into filter criteria and
//! recomputes the views after every change.

use std::str::FromStr;

use tracing::debug;

use crate::error::{CriteriaError, SourceError};
use crate::pipeline::options::{FilterOptions, PredictionOptions, year_selector};
use crate::pipeline::{Views, derive_views, filter};
use crate::record::{CollisionFilter, FilterCriteria, Severity, YearRange};
use crate::services::record_source::RecordSource;
use crate::session::RecordCache;

/// One user interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    CollisionType(CollisionFilter),
    /// `None` removes the year constraint.
    Years(Option<YearRange>),
    Severity(Severity),
    /// Back to the criteria that select everything.
    Reset,
    /// Drop the cached records and fetch again.
    Refresh,
}

impl FromStr for InputEvent {
    type Err = CriteriaError;

    /// Parses `type <name|all>`, `years <range|all>`, `severity <class>`,
    /// `reset` or `refresh`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (command, arg) = s.split_once(char::is_whitespace).unwrap_or((s, ""));
        let arg = arg.trim();

        match command.to_ascii_lowercase().as_str() {
            "type" if !arg.is_empty() => {
                Ok(InputEvent::CollisionType(arg.parse().unwrap_or_default()))
            }
            "years" if arg.eq_ignore_ascii_case("all") => Ok(InputEvent::Years(None)),
            "years" => Ok(InputEvent::Years(Some(arg.parse()?))),
            "severity" => Ok(InputEvent::Severity(arg.parse()?)),
            "reset" => Ok(InputEvent::Reset),
            "refresh" => Ok(InputEvent::Refresh),
            _ => Err(CriteriaError::UnknownCommand(s.to_string())),
        }
    }
}

/// One session: its record cache and current filter selection.
pub struct Dashboard<S> {
    cache: RecordCache<S>,
    criteria: FilterCriteria,
    top_n: usize,
    initialized: bool,
}

impl<S: RecordSource> Dashboard<S> {
    pub fn new(cache: RecordCache<S>, top_n: usize) -> Self {
        Self {
            cache,
            criteria: FilterCriteria::default(),
            top_n,
            initialized: false,
        }
    }

    /// Starts from explicit criteria instead of the dataset-wide default.
    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self.initialized = true;
        self
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Loads the records and, on first load, defaults the year range to
    /// the span of the data.
    async fn ensure_initialized(&mut self) -> Result<(), SourceError> {
        let records = self.cache.records().await?;
        if !self.initialized {
            self.criteria = year_selector(records).default_criteria();
            self.initialized = true;
        }
        Ok(())
    }

    /// Derives views for the current criteria.
    pub async fn views(&mut self) -> Result<Views<'_>, SourceError> {
        self.ensure_initialized().await?;
        let records = self.cache.records().await?;
        Ok(derive_views(records, &self.criteria, self.top_n))
    }

    /// Updates the criteria from one input event without deriving views.
    pub async fn select(&mut self, event: InputEvent) -> Result<(), SourceError> {
        debug!(?event, "Applying input event");
        if !matches!(event, InputEvent::Reset | InputEvent::Refresh) {
            self.ensure_initialized().await?;
        }
        match event {
            InputEvent::CollisionType(collision_type) => {
                self.criteria.collision_type = collision_type
            }
            InputEvent::Years(years) => self.criteria.years = years,
            InputEvent::Severity(severity) => self.criteria.severity = severity,
            InputEvent::Reset => self.initialized = false,
            InputEvent::Refresh => self.cache.invalidate(),
        }
        Ok(())
    }

    /// Applies one input event and recomputes every view.
    pub async fn apply(&mut self, event: InputEvent) -> Result<Views<'_>, SourceError> {
        self.select(event).await?;
        self.views().await
    }

    /// Filter choices for the whole dataset.
    pub async fn filter_options(&mut self) -> Result<FilterOptions, SourceError> {
        Ok(FilterOptions::from_records(self.cache.records().await?))
    }

    /// Prediction inputs drawn from the currently filtered records.
    pub async fn prediction_options(&mut self) -> Result<PredictionOptions, SourceError> {
        let records = self.cache.records().await?;
        Ok(PredictionOptions::from_records(&filter(records, &self.criteria)))
    }
}
