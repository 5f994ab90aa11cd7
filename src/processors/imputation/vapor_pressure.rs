use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use crate::utils::constants::{MAGNUS_A, MAGNUS_B, MAGNUS_BASE};
use tracing::debug;

/// Actual vapour pressure from relative humidity (%) and mean temperature.
pub fn magnus_vapor_pressure(temp_mean: f64, humidity_mean: f64) -> Option<f64> {
    let denominator = temp_mean + MAGNUS_B;
    if denominator <= 0.0 {
        return None;
    }
    let value = (humidity_mean / 100.0) * MAGNUS_BASE * (MAGNUS_A * temp_mean / denominator).exp();
    value.is_finite().then_some(value)
}

/// Compute missing vapour pressure from temperature and humidity; rows
/// lacking either input stay null. No-op unless all three columns exist.
pub fn impute(table: &StationTable, _config: &ImputationConfig) -> Result<StationTable> {
    let (Some(vapor), Some(temp), Some(humidity)) = (
        table.column(Variable::VaporPressure),
        table.column(Variable::TempMean),
        table.column(Variable::HumidityMean),
    ) else {
        return Ok(table.clone());
    };

    let mut values = vapor.to_vec();

    let mut computed = 0;
    for ((value, t), rh) in values.iter_mut().zip(temp).zip(humidity) {
        if value.is_some() {
            continue;
        }
        if let (Some(t), Some(rh)) = (t, rh) {
            *value = magnus_vapor_pressure(*t, *rh);
            computed += usize::from(value.is_some());
        }
    }

    debug!(
        "Station {}: vapor pressure computed {}",
        table.station_id(),
        computed
    );

    let mut out = table.clone();
    out.set_column(Variable::VaporPressure, values)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::imputation::test_support::table;

    #[test]
    fn test_magnus_formula() {
        let value = magnus_vapor_pressure(25.0, 50.0).unwrap();
        let expected = 0.5 * 6.11 * (17.27 * 25.0 / 262.3_f64).exp();
        assert!((value - expected).abs() < 1e-12);
        // hPa; 1.58 when expressed in kPa
        assert!((value - 15.84).abs() < 0.01);
        assert!(magnus_vapor_pressure(-237.3, 50.0).is_none());
    }

    #[test]
    fn test_only_nulls_are_computed() -> Result<()> {
        let input = table(3)
            .with_column(Variable::TempMean, vec![Some(25.0), Some(25.0), None])?
            .with_column(Variable::HumidityMean, vec![Some(50.0), Some(50.0), Some(50.0)])?
            .with_column(Variable::VaporPressure, vec![Some(9.0), None, None])?;

        let out = impute(&input, &ImputationConfig::default())?;
        let values = out.column(Variable::VaporPressure).unwrap();

        assert_eq!(values[0], Some(9.0));
        assert_eq!(values[1], magnus_vapor_pressure(25.0, 50.0));
        assert_eq!(values[2], None);
        Ok(())
    }

    #[test]
    fn test_absent_column_is_noop() -> Result<()> {
        let input = table(1)
            .with_column(Variable::TempMean, vec![Some(10.0)])?
            .with_column(Variable::HumidityMean, vec![Some(80.0)])?;

        let out = impute(&input, &ImputationConfig::default())?;
        assert!(!out.has(Variable::VaporPressure));
        assert_eq!(out, input);
        Ok(())
    }
}
