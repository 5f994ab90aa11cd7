use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::Variable;

/// One finalized station-day. Every canonical field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DailyRecord {
    pub station_id: String,
    pub date: NaiveDate,

    #[validate(range(min = 0.0))]
    pub precipitation: f64,

    pub temp_min: f64,
    pub temp_max: f64,
    pub temp_mean: f64,

    pub humidity_mean: f64,
    pub dew_point: f64,

    #[validate(range(min = 0.0))]
    pub vapor_pressure: f64,

    #[validate(range(min = 0.0))]
    pub radiation_global: f64,

    #[validate(range(min = 0.0))]
    pub sunshine_effective: f64,

    #[validate(range(min = 0.0))]
    pub sunshine_relative: f64,
}

impl DailyRecord {
    /// Build a record from canonical values in `Variable::ALL` order
    pub fn from_values(station_id: String, date: NaiveDate, values: [f64; 10]) -> Self {
        let [precipitation, temp_min, temp_max, temp_mean, humidity_mean, dew_point, vapor_pressure, radiation_global, sunshine_effective, sunshine_relative] =
            values;

        Self {
            station_id,
            date,
            precipitation,
            temp_min,
            temp_max,
            temp_mean,
            humidity_mean,
            dew_point,
            vapor_pressure,
            radiation_global,
            sunshine_effective,
            sunshine_relative,
        }
    }

    pub fn get(&self, variable: Variable) -> f64 {
        match variable {
            Variable::Precipitation => self.precipitation,
            Variable::TempMin => self.temp_min,
            Variable::TempMax => self.temp_max,
            Variable::TempMean => self.temp_mean,
            Variable::HumidityMean => self.humidity_mean,
            Variable::DewPoint => self.dew_point,
            Variable::VaporPressure => self.vapor_pressure,
            Variable::RadiationGlobal => self.radiation_global,
            Variable::SunshineEffective => self.sunshine_effective,
            Variable::SunshineRelative => self.sunshine_relative,
        }
    }

    pub fn values(&self) -> [f64; 10] {
        Variable::ALL.map(|v| self.get(v))
    }

    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.station_id, self.date)
    }

    /// Temperature consistency: `temp_min <= temp_max`
    pub fn validate_relationships(&self) -> Result<()> {
        if self.temp_min > self.temp_max {
            return Err(ProcessingError::TemperatureValidation {
                message: format!(
                    "Min temperature {} > Max temperature {}",
                    self.temp_min, self.temp_max
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(temp_min: f64, temp_max: f64) -> DailyRecord {
        let date = NaiveDate::from_ymd_opt(2023, 7, 15).unwrap();
        DailyRecord::from_values(
            "S1".to_string(),
            date,
            [0.2, temp_min, temp_max, 15.0, 70.0, 9.0, 12.0, 18.0, 6.5, 48.0],
        )
    }

    #[test]
    fn test_from_values_order() {
        let r = record(10.0, 20.0);
        assert_eq!(r.precipitation, 0.2);
        assert_eq!(r.temp_min, 10.0);
        assert_eq!(r.temp_max, 20.0);
        assert_eq!(r.sunshine_relative, 48.0);
        assert_eq!(r.values()[7], r.radiation_global);
    }

    #[test]
    fn test_validate_relationships() {
        assert!(record(10.0, 20.0).validate_relationships().is_ok());
        assert!(matches!(
            record(25.0, 20.0).validate_relationships(),
            Err(ProcessingError::TemperatureValidation { .. })
        ));
    }

    #[test]
    fn test_negative_precipitation_fails_validation() {
        let mut r = record(10.0, 20.0);
        r.precipitation = -1.0;
        assert!(r.validate().is_err());
    }
}
