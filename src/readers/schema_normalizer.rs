use crate::error::{ProcessingError, Result};
use crate::models::{StationTable, Variable};
use crate::readers::table_reader::{excel_serial_to_datetime, Cell, RawTable};
use crate::utils::constants::DATE_LABELS;
use crate::utils::filename::station_id_from_path;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use tracing::{debug, warn};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%Y%m%d"];

/// Turns a raw report into a station table: canonical columns, parsed dates,
/// duplicates removed, rows sorted by date.
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    date_only_hour: u32,
}

impl SchemaNormalizer {
    pub fn new(date_only_hour: u32) -> Self {
        Self { date_only_hour }
    }

    pub fn normalize(&self, raw: &RawTable) -> Result<StationTable> {
        let station_id = station_id_from_path(&raw.source)?;
        let labels: Vec<String> = raw.headers.iter().map(|h| normalize_label(h)).collect();

        let date_idx = labels
            .iter()
            .position(|l| DATE_LABELS.contains(&l.as_str()))
            .ok_or_else(|| {
                ProcessingError::MissingData(format!(
                    "No date column in {} (labels: {:?})",
                    raw.source.display(),
                    labels
                ))
            })?;

        let resolved: Vec<(Variable, usize)> = Variable::ALL
            .into_iter()
            .filter_map(|variable| {
                variable
                    .source_aliases()
                    .iter()
                    .find_map(|alias| labels.iter().position(|l| l == alias))
                    .map(|idx| (variable, idx))
            })
            .collect();

        let missing: Vec<&str> = Variable::ALL
            .iter()
            .filter(|v| !resolved.iter().any(|(r, _)| r == *v))
            .map(|v| v.name())
            .collect();
        if !missing.is_empty() {
            warn!("Station {}: columns not found (skipped): {:?}", station_id, missing);
        }

        let mut rows: Vec<(NaiveDateTime, Vec<Option<f64>>)> = Vec::with_capacity(raw.rows.len());
        let mut invalid_dates = 0usize;

        for raw_row in &raw.rows {
            let timestamp = raw_row
                .get(date_idx)
                .and_then(|cell| parse_timestamp(cell, self.date_only_hour));

            let Some(timestamp) = timestamp else {
                invalid_dates += 1;
                continue;
            };

            let values = resolved
                .iter()
                .map(|(_, idx)| raw_row.get(*idx).and_then(parse_number))
                .collect();
            rows.push((timestamp, values));
        }

        if invalid_dates > 0 {
            warn!(
                "Station {}: dropped {} rows with invalid date",
                station_id, invalid_dates
            );
        }

        let before = rows.len();
        let mut seen = HashSet::with_capacity(rows.len());
        rows.retain(|(timestamp, values)| {
            let bits: Vec<Option<u64>> = values.iter().map(|v| v.map(f64::to_bits)).collect();
            seen.insert((*timestamp, bits))
        });
        let exact_duplicates = before - rows.len();
        if exact_duplicates > 0 {
            debug!(
                "Station {}: removed {} exact duplicate rows",
                station_id, exact_duplicates
            );
        }

        rows.sort_by_key(|(timestamp, _)| *timestamp);

        let before = rows.len();
        let mut seen_dates = HashSet::with_capacity(rows.len());
        rows.retain(|(timestamp, _)| seen_dates.insert(timestamp.date()));
        let date_collisions = before - rows.len();
        if date_collisions > 0 {
            warn!(
                "Station {}: {} conflicting rows for an already present date (kept first)",
                station_id, date_collisions
            );
        }

        let timestamps = rows.iter().map(|(timestamp, _)| *timestamp).collect();
        let mut table = StationTable::new(station_id, timestamps);
        for (position, (variable, _)) in resolved.iter().enumerate() {
            let values = rows.iter().map(|(_, values)| values[position]).collect();
            table.set_column(*variable, values)?;
        }

        Ok(table)
    }
}

/// Trim, lower-case and replace whitespace runs with `_`
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Numeric value of a cell; text accepts a decimal comma
pub fn parse_number(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(text) => {
            let text = text.trim();
            let normalized = if !text.contains('.') && text.matches(',').count() == 1 {
                text.replace(',', ".")
            } else {
                text.to_string()
            };
            normalized.parse::<f64>().ok()?
        }
        Cell::Empty | Cell::DateTime(_) => return None,
    };

    value.is_finite().then_some(value)
}

/// Timestamp of a date cell; date-only values get `date_only_hour`
pub fn parse_timestamp(cell: &Cell, date_only_hour: u32) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(with_date_only_hour(*dt, date_only_hour)),
        Cell::Number(serial) => {
            excel_serial_to_datetime(*serial).map(|dt| with_date_only_hour(dt, date_only_hour))
        }
        Cell::Text(text) => {
            let text = text.trim();
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| with_date_only_hour(dt, date_only_hour))
                .or_else(|| {
                    DATE_FORMATS
                        .iter()
                        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                        .and_then(|d| d.and_hms_opt(date_only_hour, 0, 0))
                })
        }
        Cell::Empty => None,
    }
}

/// Dates exported without a time of day arrive as midnight, whatever the
/// encoding; midnight is read as date-only
fn with_date_only_hour(dt: NaiveDateTime, date_only_hour: u32) -> NaiveDateTime {
    if dt.time() == NaiveTime::MIN {
        dt.date().and_hms_opt(date_only_hour, 0, 0).unwrap_or(dt)
    } else {
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn raw(headers: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            source: PathBuf::from("data/estaciones/87345.xls"),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Fecha "), "fecha");
        assert_eq!(
            normalize_label("Temperatura Abrigo 150cm Minima"),
            "temperatura_abrigo_150cm_minima"
        );
        assert_eq!(normalize_label("Humedad_Media_8_14_20"), "humedad_media_8_14_20");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&text("12.5")), Some(12.5));
        assert_eq!(parse_number(&text("12,5")), Some(12.5));
        assert_eq!(parse_number(&text("abc")), None);
        assert_eq!(parse_number(&Cell::Number(3.0)), Some(3.0));
        assert_eq!(parse_number(&Cell::Empty), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let iso = parse_timestamp(&text("2023-02-01"), 12).unwrap();
        assert_eq!(iso.hour(), 12);
        assert_eq!(iso.date(), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());

        let latin = parse_timestamp(&text("01/02/2023"), 12).unwrap();
        assert_eq!(latin.date(), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());

        let with_time = parse_timestamp(&text("2023-02-01 02:00:00"), 12).unwrap();
        assert_eq!(with_time.hour(), 2);

        assert!(parse_timestamp(&text("not a date"), 12).is_none());
        assert!(parse_timestamp(&Cell::Empty, 12).is_none());
    }

    #[test]
    fn test_midnight_is_date_only_in_every_encoding() {
        let midnight = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        let workbook = parse_timestamp(&Cell::DateTime(midnight), 12);
        let serial = parse_timestamp(&Cell::Number(44927.0), 12);
        let text_midnight = parse_timestamp(&text("2023-01-01 00:00:00"), 12);
        let text_date = parse_timestamp(&text("2023-01-01"), 12);

        assert_eq!(workbook, Some(expected));
        assert_eq!(serial, Some(expected));
        assert_eq!(text_midnight, Some(expected));
        assert_eq!(text_date, Some(expected));
    }

    #[test]
    fn test_normalize_selects_renames_and_sorts() -> Result<()> {
        let table = SchemaNormalizer::new(12).normalize(&raw(
            &["Fecha", "Temperatura_Abrigo_150cm_Minima", "Viento", "Rocio_Medio"],
            vec![
                vec![text("2023-01-03"), text("5"), text("10"), text("1")],
                vec![text("2023-01-01"), text("3"), text("12"), Cell::Empty],
                vec![text("bad"), text("9"), text("9"), text("9")],
                vec![text("2023-01-02"), Cell::Empty, text("8"), text("2")],
            ],
        ))?;

        assert_eq!(table.station_id(), "87345");
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.present_variables(),
            vec![Variable::TempMin, Variable::DewPoint]
        );

        let days: Vec<u32> = table.dates().map(|d| chrono::Datelike::day(&d)).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(
            table.column(Variable::TempMin).unwrap(),
            &[Some(3.0), None, Some(5.0)]
        );
        Ok(())
    }

    #[test]
    fn test_normalize_removes_duplicates() -> Result<()> {
        let table = SchemaNormalizer::new(12).normalize(&raw(
            &["fecha", "rocio_medio"],
            vec![
                vec![text("2023-01-01"), text("1")],
                vec![text("2023-01-01"), text("1")],
                vec![text("2023-01-02"), text("2")],
                vec![text("2023-01-02"), text("7")],
            ],
        ))?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.column(Variable::DewPoint).unwrap(), &[Some(1.0), Some(2.0)]);
        Ok(())
    }

    #[test]
    fn test_missing_date_column_fails() {
        let result = SchemaNormalizer::new(12).normalize(&raw(
            &["rocio_medio"],
            vec![vec![text("1")]],
        ));
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }
}
