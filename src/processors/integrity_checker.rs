use crate::error::ProcessingError;
use crate::models::{DailyRecord, Variable};
use crate::utils::constants::{
    DEFAULT_RADIATION_MAX, MAX_HUMIDITY, MAX_PLAUSIBLE_TEMP, MIN_HUMIDITY, MIN_PLAUSIBLE_TEMP,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub violations: Vec<Violation>,
    pub station_statistics: BTreeMap<String, StationStatistics>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, violation_type: ViolationType) -> usize {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub station_id: String,
    pub date: NaiveDate,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    OutOfOrder,
    DuplicateKey,
    MinGreaterThanMax,
    NonFinite,
    OutOfRange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationStatistics {
    pub total_records: usize,
    pub invalid_records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

/// Checks the combined output: ordering, key uniqueness, temperature
/// consistency and plausible ranges. Violations are reported, never fatal.
pub struct IntegrityChecker {
    radiation_max: f64,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            radiation_max: DEFAULT_RADIATION_MAX,
        }
    }

    pub fn with_radiation_max(radiation_max: f64) -> Self {
        Self { radiation_max }
    }

    /// Records are expected in (station_id, date) order
    pub fn check_integrity(&self, records: &[DailyRecord]) -> IntegrityReport {
        let mut report = IntegrityReport {
            total_records: records.len(),
            ..IntegrityReport::default()
        };

        for window in records.windows(2) {
            self.check_ordering(&window[0], &window[1], &mut report);
        }

        for record in records {
            let before = report.violations.len();
            self.check_record(record, &mut report);
            let invalid = report.violations.len() > before;

            if invalid {
                report.invalid_records += 1;
            } else {
                report.valid_records += 1;
            }

            let stats = report
                .station_statistics
                .entry(record.station_id.clone())
                .or_default();

            stats.total_records += 1;
            if invalid {
                stats.invalid_records += 1;
            }
            stats.first_date = Some(stats.first_date.map_or(record.date, |d| d.min(record.date)));
            stats.last_date = Some(stats.last_date.map_or(record.date, |d| d.max(record.date)));
            stats.min_temp = Some(stats.min_temp.map_or(record.temp_min, |t| t.min(record.temp_min)));
            stats.max_temp = Some(stats.max_temp.map_or(record.temp_max, |t| t.max(record.temp_max)));
        }

        report
    }

    fn check_ordering(&self, prev: &DailyRecord, curr: &DailyRecord, report: &mut IntegrityReport) {
        if prev.key() == curr.key() {
            report.violations.push(Violation {
                station_id: curr.station_id.clone(),
                date: curr.date,
                violation_type: ViolationType::DuplicateKey,
                details: format!("duplicate record for {}", curr.date),
            });
        } else if prev.key() > curr.key() {
            report.violations.push(Violation {
                station_id: curr.station_id.clone(),
                date: curr.date,
                violation_type: ViolationType::OutOfOrder,
                details: format!(
                    "{} {} follows {} {}",
                    curr.station_id, curr.date, prev.station_id, prev.date
                ),
            });
        }
    }

    fn check_record(&self, record: &DailyRecord, report: &mut IntegrityReport) {
        let mut push = |violation_type: ViolationType, details: String| {
            report.violations.push(Violation {
                station_id: record.station_id.clone(),
                date: record.date,
                violation_type,
                details,
            });
        };

        let non_finite: Vec<&str> = Variable::ALL
            .iter()
            .filter(|v| !record.get(**v).is_finite())
            .map(|v| v.name())
            .collect();
        if !non_finite.is_empty() {
            push(
                ViolationType::NonFinite,
                format!("non-finite values in {:?}", non_finite),
            );
            return;
        }

        if let Err(ProcessingError::TemperatureValidation { message }) =
            record.validate_relationships()
        {
            push(ViolationType::MinGreaterThanMax, message);
        }

        if let Err(e) = record.validate() {
            push(ViolationType::OutOfRange, e.to_string());
        }

        let temps = [
            (record.temp_min, "min"),
            (record.temp_max, "max"),
            (record.temp_mean, "mean"),
        ];
        for (temp, name) in temps {
            if !(MIN_PLAUSIBLE_TEMP..=MAX_PLAUSIBLE_TEMP).contains(&temp) {
                push(
                    ViolationType::OutOfRange,
                    format!(
                        "{} temperature {} is outside [{}, {}]",
                        name, temp, MIN_PLAUSIBLE_TEMP, MAX_PLAUSIBLE_TEMP
                    ),
                );
            }
        }

        if !(MIN_HUMIDITY..=MAX_HUMIDITY).contains(&record.humidity_mean) {
            push(
                ViolationType::OutOfRange,
                format!("humidity {} is outside [{}, {}]", record.humidity_mean, MIN_HUMIDITY, MAX_HUMIDITY),
            );
        }

        if record.radiation_global > self.radiation_max {
            push(
                ViolationType::OutOfRange,
                format!(
                    "radiation {} exceeds {}",
                    record.radiation_global, self.radiation_max
                ),
            );
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let total = report.total_records.max(1) as f64;
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Total Records: {}\n", report.total_records));
        summary.push_str(&format!("Stations: {}\n", report.station_statistics.len()));
        summary.push_str(&format!(
            "Valid Records: {} ({:.1}%)\n",
            report.valid_records,
            100.0 * report.valid_records as f64 / total
        ));
        summary.push_str(&format!(
            "Invalid Records: {} ({:.1}%)\n",
            report.invalid_records,
            100.0 * report.invalid_records as f64 / total
        ));
        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));

        for violation_type in [
            ViolationType::OutOfOrder,
            ViolationType::DuplicateKey,
            ViolationType::MinGreaterThanMax,
            ViolationType::NonFinite,
            ViolationType::OutOfRange,
        ] {
            let count = report.count(violation_type);
            if count > 0 {
                summary.push_str(&format!("  {:?}: {}\n", violation_type, count));
            }
        }

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. Station {} on {}: {}\n",
                    i + 1,
                    violation.station_id,
                    violation.date,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(station: &str, day: u32, temp_min: f64, temp_max: f64) -> DailyRecord {
        DailyRecord::from_values(
            station.to_string(),
            NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
            [0.1, temp_min, temp_max, 15.0, 70.0, 9.0, 12.0, 18.0, 6.5, 48.0],
        )
    }

    #[test]
    fn test_clean_records() {
        let records = vec![
            record("A", 1, 10.0, 20.0),
            record("A", 2, 11.0, 21.0),
            record("B", 1, 9.0, 19.0),
        ];
        let report = IntegrityChecker::new().check_integrity(&records);

        assert!(report.is_clean());
        assert_eq!(report.valid_records, 3);
        assert_eq!(report.station_statistics.len(), 2);
        let a = &report.station_statistics["A"];
        assert_eq!(a.total_records, 2);
        assert_eq!(a.min_temp, Some(10.0));
        assert_eq!(a.max_temp, Some(21.0));
    }

    #[test]
    fn test_detects_ordering_and_duplicates() {
        let records = vec![
            record("A", 2, 10.0, 20.0),
            record("A", 1, 10.0, 20.0),
            record("A", 1, 10.0, 20.0),
        ];
        let report = IntegrityChecker::new().check_integrity(&records);

        assert_eq!(report.count(ViolationType::OutOfOrder), 1);
        assert_eq!(report.count(ViolationType::DuplicateKey), 1);
    }

    #[test]
    fn test_detects_value_problems() {
        let mut bad_range = record("A", 1, 10.0, 20.0);
        bad_range.humidity_mean = 130.0;
        bad_range.radiation_global = 80.0;
        let mut non_finite = record("A", 2, 10.0, 20.0);
        non_finite.dew_point = f64::NAN;

        let records = vec![bad_range, non_finite, record("A", 3, 25.0, 20.0)];
        let report = IntegrityChecker::new().check_integrity(&records);

        assert_eq!(report.count(ViolationType::OutOfRange), 2);
        assert_eq!(report.count(ViolationType::NonFinite), 1);
        assert_eq!(report.count(ViolationType::MinGreaterThanMax), 1);
        assert_eq!(report.invalid_records, 3);

        let summary = IntegrityChecker::new().generate_summary(&report);
        assert!(summary.contains("Total Records: 3"));
        assert!(summary.contains("MinGreaterThanMax: 1"));
        let inverted = report
            .violations
            .iter()
            .find(|v| v.violation_type == ViolationType::MinGreaterThanMax)
            .unwrap();
        assert_eq!(inverted.date, NaiveDate::from_ymd_opt(2023, 3, 3).unwrap());
        assert!(inverted.details.contains("Min temperature 25 > Max temperature 20"));
    }
}
