use crate::models::{DailyRecord, StationSeries, StationTable, Variable};
use tracing::{debug, info};

/// Drops every row that still misses one of the canonical variables and
/// turns the rest into [`DailyRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Finalizer;

impl Finalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn finalize(&self, table: &StationTable) -> StationSeries {
        let missing = table.missing_variables();
        if !missing.is_empty() {
            info!(
                "Station {}: no data for {:?}, every row is dropped",
                table.station_id(),
                missing.iter().map(Variable::name).collect::<Vec<_>>()
            );
            return StationSeries::new(table.station_id(), Vec::new());
        }

        let records: Vec<DailyRecord> = table
            .timestamps()
            .iter()
            .enumerate()
            .filter_map(|(row, ts)| {
                let mut values = [0.0; 10];
                for (slot, variable) in values.iter_mut().zip(Variable::ALL) {
                    *slot = table.value(variable, row)?;
                }
                Some(DailyRecord::from_values(
                    table.station_id().to_string(),
                    ts.date(),
                    values,
                ))
            })
            .collect();

        let dropped = table.len() - records.len();
        if dropped > 0 {
            debug!(
                "Station {}: dropped {} of {} rows with remaining nulls",
                table.station_id(),
                dropped,
                table.len()
            );
        }

        StationSeries::new(table.station_id(), records)
    }
}
