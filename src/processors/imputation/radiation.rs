use crate::config::ImputationConfig;
use crate::error::Result;
use crate::models::{StationTable, Variable};
use crate::processors::imputation::numeric::{median, rolling_median_centered, LinearFit};
use chrono::{Datelike, Timelike};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fill global radiation during daytime rows.
///
/// A daytime zero is treated as a gap; night rows are never touched, so a
/// zero recorded in the dark stays zero. Gaps are filled by, in order:
/// a regression on effective sunshine, the (month, hour) median of positive
/// daytime readings, and a centered rolling median of the daytime series.
/// Every daytime value ends up within `[0, radiation_max]`.
pub fn impute(table: &StationTable, config: &ImputationConfig) -> Result<StationTable> {
    let (Some(radiation), Some(sunshine)) = (
        table.column(Variable::RadiationGlobal),
        table.column(Variable::SunshineEffective),
    ) else {
        return Ok(table.clone());
    };

    let station = table.station_id();
    let upper = config.radiation_max;
    let daytime: Vec<bool> = table
        .timestamps()
        .iter()
        .map(|ts| config.is_daytime(ts.hour()))
        .collect();

    let mut values = radiation.to_vec();
    let is_gap = |values: &[Option<f64>], i: usize| {
        daytime[i] && values[i].map_or(true, |v| v == 0.0)
    };

    // 1. regression on effective sunshine
    let (train_x, train_y): (Vec<f64>, Vec<f64>) = (0..values.len())
        .filter(|&i| daytime[i])
        .filter_map(|i| match (sunshine[i], values[i]) {
            (Some(x), Some(y)) if y > 0.0 => Some((x, y)),
            _ => None,
        })
        .unzip();

    let predictable: Vec<usize> = (0..values.len())
        .filter(|&i| is_gap(&values, i) && sunshine[i].is_some())
        .collect();

    let mut regressed = 0;
    if train_x.len() >= config.radiation_min_samples && !predictable.is_empty() {
        match LinearFit::fit(&train_x, &train_y) {
            Ok(fit) => {
                for &i in &predictable {
                    if let Some(x) = sunshine[i] {
                        values[i] = Some(fit.predict(x).clamp(0.0, upper));
                        regressed += 1;
                    }
                }
            }
            Err(e) => warn!("Station {}: radiation regression skipped: {}", station, e),
        }
    }

    // 2. (month, hour) median of positive daytime readings
    let mut by_slot: HashMap<(u32, u32), Vec<f64>> = HashMap::new();
    for (i, ts) in table.timestamps().iter().enumerate() {
        if let Some(v) = values[i].filter(|v| daytime[i] && *v > 0.0) {
            by_slot.entry((ts.month(), ts.hour())).or_default().push(v);
        }
    }
    let slot_medians: HashMap<(u32, u32), f64> = by_slot
        .into_iter()
        .filter_map(|(slot, vs)| median(&vs).map(|m| (slot, m)))
        .collect();

    let mut from_slots = 0;
    for (i, ts) in table.timestamps().iter().enumerate() {
        if !is_gap(&values, i) {
            continue;
        }
        if let Some(m) = slot_medians.get(&(ts.month(), ts.hour())) {
            values[i] = Some(m.clamp(0.0, upper));
            from_slots += 1;
        }
    }

    // 3. centered rolling median, daytime zeros as gaps; night readings count
    let mut from_rolling = 0;
    if (0..values.len()).any(|i| is_gap(&values, i)) {
        let masked: Vec<Option<f64>> = (0..values.len())
            .map(|i| if is_gap(&values, i) { None } else { values[i] })
            .collect();
        let rolling = rolling_median_centered(
            &masked,
            config.rolling_window,
            config.rolling_min_periods,
        );

        for (i, m) in rolling.into_iter().enumerate() {
            if let (true, Some(m)) = (is_gap(&values, i), m) {
                values[i] = Some(m.clamp(0.0, upper));
                from_rolling += 1;
            }
        }
    }

    // 4. daytime clamp
    for (value, day) in values.iter_mut().zip(&daytime) {
        if let (true, Some(v)) = (*day, value.as_mut()) {
            *v = v.clamp(0.0, upper);
        }
    }

    debug!(
        "Station {}: radiation regression {} (trained on {}), month-hour median {}, rolling median {}",
        station,
        regressed,
        train_x.len(),
        from_slots,
        from_rolling
    );

    let mut out = table.clone();
    out.set_column(Variable::RadiationGlobal, values)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::imputation::test_support::day;
    use chrono::NaiveDate;

    fn config(min_samples: usize) -> ImputationConfig {
        ImputationConfig {
            radiation_min_samples: min_samples,
            ..ImputationConfig::default()
        }
    }

    fn table_with(
        timestamps: Vec<chrono::NaiveDateTime>,
        radiation: Vec<Option<f64>>,
        sunshine: Vec<Option<f64>>,
    ) -> StationTable {
        StationTable::new("RAD", timestamps)
            .with_column(Variable::RadiationGlobal, radiation)
            .and_then(|t| t.with_column(Variable::SunshineEffective, sunshine))
            .unwrap()
    }

    #[test]
    fn test_requires_sunshine_predictor() -> Result<()> {
        let input = StationTable::new("RAD", vec![day(0)])
            .with_column(Variable::RadiationGlobal, vec![None])?;
        assert_eq!(impute(&input, &config(2))?, input);
        Ok(())
    }

    #[test]
    fn test_regression_fills_daytime_gaps_and_zeros() -> Result<()> {
        // radiation = 2 + 3 * sunshine on the training rows
        let sunshine = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0)];
        let radiation = vec![Some(5.0), Some(8.0), Some(11.0), None, Some(0.0), Some(20.0)];
        let input = table_with((0..6).map(day).collect(), radiation, sunshine);

        let out = impute(&input, &config(3))?;
        let values = out.column(Variable::RadiationGlobal).unwrap();

        assert!((values[3].unwrap() - 14.0).abs() < 1e-9);
        assert!((values[4].unwrap() - 17.0).abs() < 1e-9);
        assert_eq!(values[5], Some(20.0));
        Ok(())
    }

    #[test]
    fn test_night_zero_is_preserved() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let timestamps = vec![
            date.and_hms_opt(2, 0, 0).unwrap(),
            date.and_hms_opt(10, 0, 0).unwrap(),
            date.and_hms_opt(12, 0, 0).unwrap(),
            date.and_hms_opt(14, 0, 0).unwrap(),
        ];
        let input = table_with(
            timestamps,
            vec![Some(0.0), Some(10.0), Some(0.0), Some(14.0)],
            vec![None, None, None, None],
        );

        let out = impute(&input, &config(30))?;
        let values = out.column(Variable::RadiationGlobal).unwrap();

        assert_eq!(values[0], Some(0.0));
        // Daytime zero filled by the rolling median of 0 (night), 10 and 14
        assert_eq!(values[2], Some(10.0));
        Ok(())
    }

    #[test]
    fn test_rolling_median_includes_night_readings() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let timestamps = vec![
            date.and_hms_opt(5, 0, 0).unwrap(),
            date.and_hms_opt(6, 0, 0).unwrap(),
            date.and_hms_opt(9, 0, 0).unwrap(),
            date.and_hms_opt(11, 0, 0).unwrap(),
            date.and_hms_opt(20, 0, 0).unwrap(),
        ];
        let input = table_with(
            timestamps,
            vec![Some(1.0), Some(2.0), None, Some(30.0), Some(3.0)],
            vec![None; 5],
        );

        let out = impute(&input, &config(30))?;
        let values = out.column(Variable::RadiationGlobal).unwrap();

        // No (June, 9:00) history; median of 1, 2, 30 and 3
        assert_eq!(values[2], Some(2.5));
        assert_eq!(values[0], Some(1.0));
        assert_eq!(values[4], Some(3.0));
        Ok(())
    }

    #[test]
    fn test_month_hour_median_fallback() -> Result<()> {
        let timestamps: Vec<_> = (0..5).map(day).collect();
        let input = table_with(
            timestamps,
            vec![Some(10.0), Some(30.0), None, Some(20.0), Some(0.0)],
            vec![None; 5],
        );

        let out = impute(&input, &config(30))?;
        let values = out.column(Variable::RadiationGlobal).unwrap();

        // All rows share (January, 12:00): median of 10, 30, 20
        assert_eq!(values[2], Some(20.0));
        assert_eq!(values[4], Some(20.0));
        Ok(())
    }

    #[test]
    fn test_daytime_values_clamped() -> Result<()> {
        let input = table_with(
            (0..3).map(day).collect(),
            vec![Some(75.0), Some(-3.0), Some(30.0)],
            vec![Some(1.0), Some(2.0), Some(3.0)],
        );

        let out = impute(&input, &config(30))?;
        assert_eq!(
            out.column(Variable::RadiationGlobal).unwrap(),
            &[Some(60.0), Some(0.0), Some(30.0)]
        );
        Ok(())
    }

    #[test]
    fn test_night_gap_left_for_finalizer() -> Result<()> {
        let date = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let input = table_with(
            vec![
                date.and_hms_opt(3, 0, 0).unwrap(),
                date.and_hms_opt(12, 0, 0).unwrap(),
            ],
            vec![None, Some(15.0)],
            vec![Some(0.0), Some(5.0)],
        );

        let out = impute(&input, &config(2))?;
        assert_eq!(out.value(Variable::RadiationGlobal, 0), None);
        Ok(())
    }
}
