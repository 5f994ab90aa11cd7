//! Pipeline configuration.
//!
//! Defaults are compiled in; an optional file (TOML, YAML or JSON, picked by
//! extension) and `CLIMA__`-prefixed environment variables override them, in
//! that order. Nested keys use a double underscore, e.g.
//! `CLIMA__IMPUTATION__RADIATION_MAX=40`.

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_DATE_ONLY_HOUR, DEFAULT_DAYLIGHT_END_HOUR, DEFAULT_DAYLIGHT_START_HOUR,
    DEFAULT_RADIATION_MAX, DEFAULT_RADIATION_MIN_SAMPLES, DEFAULT_ROLLING_MIN_PERIODS,
    DEFAULT_ROLLING_WINDOW, DEFAULT_SUNSHINE_MIN_SAMPLES, SUPPORTED_EXTENSIONS,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

pub const ENV_PREFIX: &str = "CLIMA";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub imputation: ImputationConfig,
    pub processing: ProcessingConfig,
}

/// Tunables of the per-station imputation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImputationConfig {
    /// Minimum daytime training rows before the radiation regression is used.
    #[validate(range(min = 2))]
    pub radiation_min_samples: usize,

    /// Minimum paired rows before either sunshine cross-regression is used.
    #[validate(range(min = 2))]
    pub sunshine_min_samples: usize,

    /// First hour (inclusive) of the daytime mask.
    #[validate(range(max = 23))]
    pub daylight_start_hour: u32,

    /// Last hour (inclusive) of the daytime mask.
    #[validate(range(max = 23))]
    pub daylight_end_hour: u32,

    /// Physical upper bound for global radiation.
    #[validate(range(min = 0.0))]
    pub radiation_max: f64,

    #[validate(range(min = 1))]
    pub rolling_window: usize,

    #[validate(range(min = 1))]
    pub rolling_min_periods: usize,

    /// Hour attached to date values that carry no time of day.
    #[validate(range(max = 23))]
    pub date_only_hour: u32,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            radiation_min_samples: DEFAULT_RADIATION_MIN_SAMPLES,
            sunshine_min_samples: DEFAULT_SUNSHINE_MIN_SAMPLES,
            daylight_start_hour: DEFAULT_DAYLIGHT_START_HOUR,
            daylight_end_hour: DEFAULT_DAYLIGHT_END_HOUR,
            radiation_max: DEFAULT_RADIATION_MAX,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            rolling_min_periods: DEFAULT_ROLLING_MIN_PERIODS,
            date_only_hour: DEFAULT_DATE_ONLY_HOUR,
        }
    }
}

impl ImputationConfig {
    pub fn is_daytime(&self, hour: u32) -> bool {
        (self.daylight_start_hour..=self.daylight_end_hour).contains(&hour)
    }

    pub fn validate_all(&self) -> Result<()> {
        self.validate()?;

        if self.daylight_start_hour > self.daylight_end_hour {
            return Err(ProcessingError::Config(format!(
                "daylight_start_hour ({}) must not exceed daylight_end_hour ({})",
                self.daylight_start_hour, self.daylight_end_hour
            )));
        }

        if self.rolling_min_periods > self.rolling_window {
            return Err(ProcessingError::Config(format!(
                "rolling_min_periods ({}) must not exceed rolling_window ({})",
                self.rolling_min_periods, self.rolling_window
            )));
        }

        Ok(())
    }
}

/// Settings of the directory-level aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProcessingConfig {
    #[validate(range(min = 1))]
    pub max_workers: usize,

    /// Only file names containing this substring are processed.
    pub file_pattern: Option<String>,

    /// Lower-case file extensions treated as station reports.
    #[validate(length(min = 1))]
    pub extensions: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            file_pattern: None,
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ProcessingConfig {
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|allowed| *allowed == e));

        let pattern_ok = match self.file_pattern.as_deref() {
            Some(pattern) if !pattern.is_empty() => file_name.contains(pattern),
            _ => true,
        };

        extension_ok && pattern_ok
    }
}

impl PipelineConfig {
    /// Build the configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate_all()?;
        Ok(config)
    }

    pub fn validate_all(&self) -> Result<()> {
        self.imputation.validate_all()?;
        self.processing.validate()?;
        Ok(())
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.processing.max_workers = max_workers;
        self
    }

    pub fn with_file_pattern(mut self, pattern: Option<String>) -> Self {
        self.processing.file_pattern = pattern;
        self
    }
}
