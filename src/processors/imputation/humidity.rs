use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use crate::processors::imputation::numeric::interpolate_linear;
use tracing::debug;

/// Linear interpolation of mean relative humidity.
pub fn impute(table: &StationTable, _config: &ImputationConfig) -> Result<StationTable> {
    let Some(column) = table.column(Variable::HumidityMean) else {
        return Ok(table.clone());
    };

    let mut values = column.to_vec();
    let filled = interpolate_linear(&mut values);
    debug!("Station {}: humidity interpolated {}", table.station_id(), filled);

    let mut out = table.clone();
    out.set_column(Variable::HumidityMean, values)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::imputation::test_support::table;

    #[test]
    fn test_interpolates_humidity() -> Result<()> {
        let input = table(4).with_column(
            Variable::HumidityMean,
            vec![None, Some(60.0), None, Some(80.0)],
        )?;
        let out = impute(&input, &ImputationConfig::default())?;

        assert_eq!(
            out.column(Variable::HumidityMean).unwrap(),
            &[None, Some(60.0), Some(70.0), Some(80.0)]
        );
        Ok(())
    }

    #[test]
    fn test_absent_column_is_noop() -> Result<()> {
        let input = table(2);
        assert_eq!(impute(&input, &ImputationConfig::default())?, input);
        Ok(())
    }
}
