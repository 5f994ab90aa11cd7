use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ProcessingError, Result};

/// The ten meteorological fields the pipeline guarantees to be null-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Precipitation,
    TempMin,
    TempMax,
    TempMean,
    HumidityMean,
    DewPoint,
    VaporPressure,
    RadiationGlobal,
    SunshineEffective,
    SunshineRelative,
}

impl Variable {
    pub const ALL: [Variable; 10] = [
        Variable::Precipitation,
        Variable::TempMin,
        Variable::TempMax,
        Variable::TempMean,
        Variable::HumidityMean,
        Variable::DewPoint,
        Variable::VaporPressure,
        Variable::RadiationGlobal,
        Variable::SunshineEffective,
        Variable::SunshineRelative,
    ];

    /// Canonical output column name
    pub fn name(&self) -> &'static str {
        match self {
            Variable::Precipitation => "precipitation",
            Variable::TempMin => "temp_min",
            Variable::TempMax => "temp_max",
            Variable::TempMean => "temp_mean",
            Variable::HumidityMean => "humidity_mean",
            Variable::DewPoint => "dew_point",
            Variable::VaporPressure => "vapor_pressure",
            Variable::RadiationGlobal => "radiation_global",
            Variable::SunshineEffective => "sunshine_effective",
            Variable::SunshineRelative => "sunshine_relative",
        }
    }

    /// Normalized source labels that resolve to this variable, in priority order
    pub fn source_aliases(&self) -> &'static [&'static str] {
        match self {
            Variable::Precipitation => &["precipitacion_pluviometrica", "precipitacion", "precipitation"],
            Variable::TempMin => &["temperatura_abrigo_150cm_minima", "temperatura_minima", "temp_min"],
            Variable::TempMax => &["temperatura_abrigo_150cm_maxima", "temperatura_maxima", "temp_max"],
            Variable::TempMean => &["temperatura_abrigo_150cm", "temperatura_media", "temp_mean"],
            Variable::HumidityMean => &["humedad_media_8_14_20", "humedad_media", "humidity_mean"],
            Variable::DewPoint => &["rocio_medio", "dew_point"],
            Variable::VaporPressure => &["tesion_vapor_media", "tension_vapor_media", "vapor_pressure"],
            Variable::RadiationGlobal => &["radiacion_global", "radiation_global"],
            Variable::SunshineEffective => &["heliofania_efectiva", "sunshine_effective"],
            Variable::SunshineRelative => &["heliofania_relativa", "sunshine_relative"],
        }
    }

    pub fn matches_label(&self, normalized_label: &str) -> bool {
        self.source_aliases().contains(&normalized_label)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the precipitation column still holds depths or the log/min-max scaled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrecipitationScale {
    #[default]
    Raw,
    Normalized,
}

/// Column-oriented table of one station's rows, ordered by timestamp.
///
/// A variable that the source did not provide has no column at all, which
/// stages treat as "nothing to do". A present column may still hold nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct StationTable {
    station_id: String,
    timestamps: Vec<NaiveDateTime>,
    columns: BTreeMap<Variable, Vec<Option<f64>>>,
    precipitation_scale: PrecipitationScale,
}

impl StationTable {
    pub fn new(station_id: impl Into<String>, timestamps: Vec<NaiveDateTime>) -> Self {
        Self {
            station_id: station_id.into(),
            timestamps,
            columns: BTreeMap::new(),
            precipitation_scale: PrecipitationScale::Raw,
        }
    }

    pub fn with_column(mut self, variable: Variable, values: Vec<Option<f64>>) -> Result<Self> {
        self.set_column(variable, values)?;
        Ok(self)
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.timestamps.iter().map(|ts| ts.date())
    }

    pub fn has(&self, variable: Variable) -> bool {
        self.columns.contains_key(&variable)
    }

    pub fn column(&self, variable: Variable) -> Option<&[Option<f64>]> {
        self.columns.get(&variable).map(Vec::as_slice)
    }

    pub fn present_variables(&self) -> Vec<Variable> {
        self.columns.keys().copied().collect()
    }

    pub fn missing_variables(&self) -> Vec<Variable> {
        Variable::ALL
            .into_iter()
            .filter(|v| !self.has(*v))
            .collect()
    }

    /// Replace (or add) a column; its length must match the row count
    pub fn set_column(&mut self, variable: Variable, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.timestamps.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Column {} has {} values but station {} has {} rows",
                variable,
                values.len(),
                self.station_id,
                self.timestamps.len()
            )));
        }
        self.columns.insert(variable, values);
        Ok(())
    }

    pub fn null_count(&self, variable: Variable) -> Option<usize> {
        self.column(variable)
            .map(|values| values.iter().filter(|v| v.is_none()).count())
    }

    pub fn precipitation_scale(&self) -> PrecipitationScale {
        self.precipitation_scale
    }

    pub fn set_precipitation_scale(&mut self, scale: PrecipitationScale) {
        self.precipitation_scale = scale;
    }

    /// Keep only the rows whose flag is `true`
    pub fn retain_rows(&mut self, keep: &[bool]) -> Result<()> {
        if keep.len() != self.timestamps.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Row mask has {} entries but station {} has {} rows",
                keep.len(),
                self.station_id,
                self.timestamps.len()
            )));
        }

        self.timestamps = select(&self.timestamps, keep);
        for values in self.columns.values_mut() {
            *values = select(values, keep);
        }
        Ok(())
    }

    /// Value of `variable` at `row`, `None` if the column is absent or null there
    pub fn value(&self, variable: Variable, row: usize) -> Option<f64> {
        self.column(variable).and_then(|values| values.get(row).copied().flatten())
    }
}

fn select<T: Clone>(items: &[T], keep: &[bool]) -> Vec<T> {
    items
        .iter()
        .zip(keep)
        .filter(|(_, keep)| **keep)
        .map(|(item, _)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_alias_resolution() {
        assert!(Variable::TempMin.matches_label("temperatura_abrigo_150cm_minima"));
        assert!(Variable::TempMean.matches_label("temperatura_abrigo_150cm"));
        assert!(Variable::HumidityMean.matches_label("humedad_media_8_14_20"));
        assert!(Variable::VaporPressure.matches_label("tesion_vapor_media"));
        assert!(!Variable::TempMax.matches_label("temperatura_abrigo_150cm"));
    }

    #[test]
    fn test_column_length_checked() {
        let mut table = StationTable::new("s1", vec![ts(1), ts(2)]);
        assert!(table.set_column(Variable::TempMin, vec![Some(1.0)]).is_err());
        assert!(table
            .set_column(Variable::TempMin, vec![Some(1.0), None])
            .is_ok());
        assert_eq!(table.null_count(Variable::TempMin), Some(1));
        assert_eq!(table.null_count(Variable::TempMax), None);
    }

    #[test]
    fn test_retain_rows() -> Result<()> {
        let mut table = StationTable::new("s1", vec![ts(1), ts(2), ts(3)])
            .with_column(Variable::DewPoint, vec![Some(1.0), None, Some(3.0)])?;

        table.retain_rows(&[true, false, true])?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.timestamps(), &[ts(1), ts(3)]);
        assert_eq!(
            table.column(Variable::DewPoint),
            Some(&[Some(1.0), Some(3.0)][..])
        );
        Ok(())
    }

    #[test]
    fn test_missing_variables() -> Result<()> {
        let table = StationTable::new("s1", vec![ts(1)])
            .with_column(Variable::Precipitation, vec![Some(0.0)])?;
        let missing = table.missing_variables();
        assert_eq!(missing.len(), 9);
        assert!(!missing.contains(&Variable::Precipitation));
        Ok(())
    }
}
