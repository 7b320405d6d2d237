//! Pipeline settings.
//!
//! Settings come from an optional TOML/JSON/YAML file layered under
//! `GWO__`-prefixed environment variables (`GWO__RESAMPLER__DISCRETE_FILL=linear`),
//! then command-line flags override individual values.

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::utils::constants::{DEFAULT_HOURLY_CUTOVER, DEFAULT_MAX_INTERPOLATION_GAP_HOURS};

/// Tag given to web-table cloud cells at hours with no scheduled observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OffScheduleCloud {
    #[default]
    NotObserved,
    Missing,
}

/// How cloud cover and weather are carried between 3-hourly observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DiscreteFill {
    /// Repeat the last observation until the next one.
    #[default]
    HoldForward,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NormalizerConfig {
    pub off_schedule_cloud: OffScheduleCloud,
    /// Fail on malformed cells instead of recording them as missing.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_range"))]
pub struct ResampleConfig {
    /// First day of 1-hour native spacing; 3-hourly before.
    pub hourly_cutover: NaiveDate,
    pub discrete_fill: DiscreteFill,
    #[validate(range(min = 1, max = 48))]
    pub max_interpolation_gap_hours: u32,
    /// Hourly output range; defaults to the gap-filled range.
    pub range_start: Option<NaiveDateTime>,
    pub range_end: Option<NaiveDateTime>,
}

fn validate_range(config: &ResampleConfig) -> std::result::Result<(), ValidationError> {
    match (config.range_start, config.range_end) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::new("range_start_after_end")),
        _ => Ok(()),
    }
}

impl Default for ResampleConfig {
    fn default() -> Self {
        let (y, m, d) = DEFAULT_HOURLY_CUTOVER;
        Self {
            hourly_cutover: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            discrete_fill: DiscreteFill::default(),
            max_interpolation_gap_hours: DEFAULT_MAX_INTERPOLATION_GAP_HOURS,
            range_start: None,
            range_end: None,
        }
    }
}

impl ResampleConfig {
    pub fn with_discrete_fill(mut self, discrete_fill: DiscreteFill) -> Self {
        self.discrete_fill = discrete_fill;
        self
    }

    pub fn with_max_gap_hours(mut self, hours: u32) -> Self {
        self.max_interpolation_gap_hours = hours;
        self
    }

    pub fn with_hourly_cutover(mut self, date: NaiveDate) -> Self {
        self.hourly_cutover = date;
        self
    }

    pub fn with_range(mut self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        self.range_start = start;
        self.range_end = end;
        self
    }

    pub fn hourly_cutover_timestamp(&self) -> NaiveDateTime {
        self.hourly_cutover.and_hms_opt(0, 0, 0).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate(nested)]
    pub normalizer: NormalizerConfig,
    #[validate(nested)]
    pub resampler: ResampleConfig,
}

impl PipelineConfig {
    /// Load from an optional file plus `GWO__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("GWO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: PipelineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
