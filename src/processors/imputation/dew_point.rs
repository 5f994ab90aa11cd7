use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use crate::processors::imputation::numeric::{interpolate_linear, mean_abs_diff};
use tracing::debug;

/// Fill dew point as `temp_mean - d`, `d` being the station's mean absolute
/// spread between the two, then interpolate what is left.
pub fn impute(table: &StationTable, _config: &ImputationConfig) -> Result<StationTable> {
    let (Some(mean), Some(dew)) = (
        table.column(Variable::TempMean),
        table.column(Variable::DewPoint),
    ) else {
        return Ok(table.clone());
    };

    let spread = mean_abs_diff(mean, dew);
    let mut values = dew.to_vec();

    let mut from_mean = 0;
    for (value, avg) in values.iter_mut().zip(mean) {
        if let (true, Some(avg)) = (value.is_none(), avg) {
            *value = Some(avg - spread);
            from_mean += 1;
        }
    }
    let interpolated = interpolate_linear(&mut values);

    debug!(
        "Station {}: dew point from mean {} (spread {:.3}), interpolated {}",
        table.station_id(),
        from_mean,
        spread,
        interpolated
    );

    let mut out = table.clone();
    out.set_column(Variable::DewPoint, values)?;
    Ok(out)
}
