use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use crate::processors::imputation::numeric::{interpolate_linear, LinearFit};
use tracing::{debug, warn};

/// Cross-impute effective and relative sunshine from each other, then
/// interpolate the residual gaps of both.
pub fn impute(table: &StationTable, config: &ImputationConfig) -> Result<StationTable> {
    let (Some(effective), Some(relative)) = (
        table.column(Variable::SunshineEffective),
        table.column(Variable::SunshineRelative),
    ) else {
        return Ok(table.clone());
    };

    let station = table.station_id();
    let mut effective = effective.to_vec();
    let mut relative = relative.to_vec();

    let from_relative = cross_fill(
        &mut effective,
        &relative,
        config.sunshine_min_samples,
    )
    .unwrap_or_else(|e| {
        warn!(
            "Station {}: effective-from-relative sunshine regression skipped: {}",
            station, e
        );
        0
    });

    let from_effective = cross_fill(
        &mut relative,
        &effective,
        config.sunshine_min_samples,
    )
    .unwrap_or_else(|e| {
        warn!(
            "Station {}: relative-from-effective sunshine regression skipped: {}",
            station, e
        );
        0
    });

    let interpolated = interpolate_linear(&mut effective) + interpolate_linear(&mut relative);

    debug!(
        "Station {}: sunshine effective<-relative {}, relative<-effective {}, interpolated {}",
        station, from_relative, from_effective, interpolated
    );

    let mut out = table.clone();
    out.set_column(Variable::SunshineEffective, effective)?;
    out.set_column(Variable::SunshineRelative, relative)?;
    Ok(out)
}

/// Predict nulls of `target` from `predictor` with a regression fitted on the
/// rows where both are known. Returns the number of predicted cells.
fn cross_fill(
    target: &mut [Option<f64>],
    predictor: &[Option<f64>],
    min_samples: usize,
) -> Result<usize> {
    let (x, y): (Vec<f64>, Vec<f64>) = predictor
        .iter()
        .zip(target.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();

    let pending = target
        .iter()
        .zip(predictor)
        .any(|(y, x)| y.is_none() && x.is_some());

    if x.len() < min_samples || !pending {
        return Ok(0);
    }

    let fit = LinearFit::fit(&x, &y)?;
    let mut predicted = 0;
    for (y, x) in target.iter_mut().zip(predictor) {
        if let (true, Some(x)) = (y.is_none(), x) {
            *y = Some(fit.predict(*x));
            predicted += 1;
        }
    }
    Ok(predicted)
}
