use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{PrecipitationScale, StationTable, Variable};
use crate::processors::imputation::numeric::{interpolate_linear, interpolate_local_polynomial};
use crate::utils::constants::PRECIPITATION_CURVE_ORDER;
use tracing::{debug, warn};

/// Clip, log-transform and min-max scale precipitation, then fill gaps with a
/// local curve (linear if the curve cannot be built).
pub fn impute(table: &StationTable, _config: &ImputationConfig) -> Result<StationTable> {
    let Some(column) = table.column(Variable::Precipitation) else {
        return Ok(table.clone());
    };

    let mut out = table.clone();
    let mut values: Vec<Option<f64>> = column.to_vec();

    if table.precipitation_scale() == PrecipitationScale::Raw {
        let clipped: Vec<Option<f64>> = values.iter().map(|v| v.map(|x| x.max(0.0))).collect();
        let logged: Vec<Option<f64>> = clipped.iter().map(|v| v.map(f64::ln_1p)).collect();

        match log_range(&logged) {
            Some((min, max)) if max > min => {
                let span = max - min;
                values = logged.iter().map(|v| v.map(|x| (x - min) / span)).collect();
                out.set_precipitation_scale(PrecipitationScale::Normalized);
            }
            _ => {
                debug!(
                    "Station {}: degenerate precipitation range, scaling skipped",
                    table.station_id()
                );
                values = clipped;
            }
        }
    }

    let filled = match interpolate_local_polynomial(&mut values, PRECIPITATION_CURVE_ORDER) {
        Ok(filled) => filled,
        Err(e) => {
            warn!(
                "Station {}: precipitation curve fill failed ({}), using linear interpolation",
                table.station_id(),
                e
            );
            interpolate_linear(&mut values)
        }
    };

    let upper = match out.precipitation_scale() {
        PrecipitationScale::Normalized => 1.0,
        PrecipitationScale::Raw => f64::INFINITY,
    };
    for value in values.iter_mut().flatten() {
        *value = value.clamp(0.0, upper);
    }

    debug!(
        "Station {}: precipitation filled {} values",
        table.station_id(),
        filled
    );

    out.set_column(Variable::Precipitation, values)?;
    Ok(out)
}

fn log_range(values: &[Option<f64>]) -> Option<(f64, f64)> {
    values.iter().flatten().fold(None, |range, &x| match range {
        None => Some((x, x)),
        Some((lo, hi)) => Some((f64::min(lo, x), f64::max(hi, x))),
    })
}
