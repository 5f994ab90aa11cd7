//! Column-wise imputation of one station table.
//!
//! Stages run in the fixed order of [`STAGES`]. Each one reads the columns
//! listed in its `reads` (some of them filled by an earlier stage) and only
//! writes the columns listed in its `writes`. A stage whose inputs are absent
//! is a no-op; a stage that fails is logged and skipped.

pub mod dew_point;
pub mod humidity;
pub mod numeric;
pub mod precipitation;
pub mod radiation;
pub mod sunshine;
pub mod temperature;
pub mod vapor_pressure;

use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub type StageFn = fn(&StationTable, &ImputationConfig) -> Result<StationTable>;

/// One column-wise transform of the engine.
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub reads: &'static [Variable],
    pub writes: &'static [Variable],
    pub run: StageFn,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish()
    }
}

/// Stage order. Dependencies form a chain:
/// temperature fills `temp_mean` before dew point and vapor pressure read it,
/// humidity is interpolated before vapor pressure reads it,
/// radiation reads `sunshine_effective` before sunshine cross-imputation fills it.
pub const STAGES: [Stage; 7] = [
    Stage {
        name: "precipitation",
        reads: &[Variable::Precipitation],
        writes: &[Variable::Precipitation],
        run: precipitation::impute,
    },
    Stage {
        name: "temperature",
        reads: &[Variable::TempMin, Variable::TempMax, Variable::TempMean],
        writes: &[Variable::TempMin, Variable::TempMax, Variable::TempMean],
        run: temperature::impute,
    },
    Stage {
        name: "humidity",
        reads: &[Variable::HumidityMean],
        writes: &[Variable::HumidityMean],
        run: humidity::impute,
    },
    Stage {
        name: "dew_point",
        reads: &[Variable::TempMean, Variable::DewPoint],
        writes: &[Variable::DewPoint],
        run: dew_point::impute,
    },
    Stage {
        name: "vapor_pressure",
        reads: &[Variable::TempMean, Variable::HumidityMean, Variable::VaporPressure],
        writes: &[Variable::VaporPressure],
        run: vapor_pressure::impute,
    },
    Stage {
        name: "radiation",
        reads: &[Variable::RadiationGlobal, Variable::SunshineEffective],
        writes: &[Variable::RadiationGlobal],
        run: radiation::impute,
    },
    Stage {
        name: "sunshine",
        reads: &[Variable::SunshineEffective, Variable::SunshineRelative],
        writes: &[Variable::SunshineEffective, Variable::SunshineRelative],
        run: sunshine::impute,
    },
];

/// A stage that failed and was passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: String,
    pub message: String,
}

/// Run `stage`, returning the input unchanged (and the failure) if it errors.
pub fn fail_soft(
    stage: &Stage,
    table: StationTable,
    config: &ImputationConfig,
) -> (StationTable, Option<StageFailure>) {
    match (stage.run)(&table, config) {
        Ok(imputed) => (imputed, None),
        Err(e) => {
            warn!(
                "Station {}: stage '{}' failed, passing table through: {}",
                table.station_id(),
                stage.name,
                e
            );
            let failure = StageFailure {
                stage: stage.name.to_string(),
                message: e.to_string(),
            };
            (table, Some(failure))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    pub table: StationTable,
    pub failures: Vec<StageFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct ImputationEngine {
    config: ImputationConfig,
}

impl ImputationEngine {
    pub fn new(config: ImputationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImputationConfig {
        &self.config
    }

    /// Run every stage in order over one station table
    pub fn run(&self, table: StationTable) -> ImputationOutcome {
        let mut table = table;
        let mut failures = Vec::new();

        for stage in &STAGES {
            let before = nulls_in(&table, stage.writes);
            let (next, failure) = fail_soft(stage, table, &self.config);
            table = next;

            if let Some(failure) = failure {
                failures.push(failure);
                continue;
            }

            let after = nulls_in(&table, stage.writes);
            debug!(
                "Station {}: stage '{}' nulls {} -> {}",
                table.station_id(),
                stage.name,
                before,
                after
            );
        }

        ImputationOutcome { table, failures }
    }
}

fn nulls_in(table: &StationTable, variables: &[Variable]) -> usize {
    variables
        .iter()
        .filter_map(|v| table.null_count(*v))
        .sum()
}
