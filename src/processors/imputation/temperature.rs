use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use crate::processors::imputation::numeric::{interpolate_linear, mean_abs_diff};
use tracing::debug;

/// Repair and fill the min/max/mean temperature triple.
///
/// Runs only when all three columns exist:
/// 1. swap min and max where min > max
/// 2. mean = (min + max) / 2 where the mean is missing
/// 3. min = mean - d_min and max = mean + d_max, with d the station's mean
///    absolute deviation from the mean
/// 4. linear interpolation of what is still missing
///
/// The swap is repeated after interpolation so that filled rows also satisfy
/// min <= max.
pub fn impute(table: &StationTable, _config: &ImputationConfig) -> Result<StationTable> {
    let (Some(min), Some(max), Some(mean)) = (
        table.column(Variable::TempMin),
        table.column(Variable::TempMax),
        table.column(Variable::TempMean),
    ) else {
        return Ok(table.clone());
    };

    let mut min = min.to_vec();
    let mut max = max.to_vec();
    let mut mean = mean.to_vec();

    let swapped = swap_inverted(&mut min, &mut max);

    let mut means_filled = 0;
    for ((lo, hi), avg) in min.iter().zip(&max).zip(mean.iter_mut()) {
        if avg.is_none() {
            if let (Some(lo), Some(hi)) = (lo, hi) {
                *avg = Some((lo + hi) / 2.0);
                means_filled += 1;
            }
        }
    }

    let d_min = mean_abs_diff(&min, &mean);
    let d_max = mean_abs_diff(&max, &mean);

    let mut bounds_filled = 0;
    for ((lo, hi), avg) in min.iter_mut().zip(max.iter_mut()).zip(&mean) {
        let Some(avg) = avg else {
            continue;
        };
        if lo.is_none() {
            *lo = Some(avg - d_min);
            bounds_filled += 1;
        }
        if hi.is_none() {
            *hi = Some(avg + d_max);
            bounds_filled += 1;
        }
    }

    let interpolated =
        interpolate_linear(&mut min) + interpolate_linear(&mut max) + interpolate_linear(&mut mean);
    let reswapped = swap_inverted(&mut min, &mut max);

    debug!(
        "Station {}: temperature swapped {}, means {}, bounds {} (d_min {:.3}, d_max {:.3}), interpolated {}, re-swapped {}",
        table.station_id(),
        swapped,
        means_filled,
        bounds_filled,
        d_min,
        d_max,
        interpolated,
        reswapped
    );

    let mut out = table.clone();
    out.set_column(Variable::TempMin, min)?;
    out.set_column(Variable::TempMax, max)?;
    out.set_column(Variable::TempMean, mean)?;
    Ok(out)
}

fn swap_inverted(min: &mut [Option<f64>], max: &mut [Option<f64>]) -> usize {
    let mut swapped = 0;
    for (lo, hi) in min.iter_mut().zip(max.iter_mut()) {
        if let (Some(a), Some(b)) = (*lo, *hi) {
            if a > b {
                *lo = Some(b);
                *hi = Some(a);
                swapped += 1;
            }
        }
    }
    swapped
}
