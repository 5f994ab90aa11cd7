use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    CANDIDATE_DELIMITERS, DELIMITED_EXTENSIONS, MISSING_MARKERS, WORKBOOK_EXTENSIONS,
};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use encoding_rs::WINDOWS_1252;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One raw cell, before any column knows what it should contain.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Wrap a text field, mapping blanks and missing markers to `Empty`
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    fn from_workbook(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) | Data::DateTimeIso(s) => Cell::from_text(s),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(Cell::DateTime)
                .unwrap_or(Cell::Empty),
            _ => Cell::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// A parsed report: the header row plus data rows, untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub source: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Delimited,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            SourceFormat::Workbook
        } else if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
            SourceFormat::Delimited
        } else {
            // Exports with odd extensions are more often text than binary
            SourceFormat::Delimited
        }
    }

    pub fn fallback(self) -> Self {
        match self {
            SourceFormat::Workbook => SourceFormat::Delimited,
            SourceFormat::Delimited => SourceFormat::Workbook,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TableReader;

impl TableReader {
    pub fn new() -> Self {
        Self
    }

    /// Load a report, returning `None` (after logging) when it cannot be parsed
    pub fn load(&self, path: &Path) -> Option<RawTable> {
        match self.read(path) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Unreadable source {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Read a report with the format implied by its extension, falling back to the other one
    pub fn read(&self, path: &Path) -> Result<RawTable> {
        let primary = SourceFormat::from_path(path);

        match self.read_as(path, primary) {
            Ok(table) => Ok(table),
            Err(primary_err) => {
                debug!(
                    "Reading {} as {:?} failed ({}), trying {:?}",
                    path.display(),
                    primary,
                    primary_err,
                    primary.fallback()
                );
                self.read_as(path, primary.fallback()).map_err(|fallback_err| {
                    ProcessingError::InvalidFormat(format!(
                        "{}: {:?} read failed ({}); {:?} read failed ({})",
                        path.display(),
                        primary,
                        primary_err,
                        primary.fallback(),
                        fallback_err
                    ))
                })
            }
        }
    }

    pub fn read_as(&self, path: &Path, format: SourceFormat) -> Result<RawTable> {
        let table = match format {
            SourceFormat::Workbook => self.read_workbook(path)?,
            SourceFormat::Delimited => self.read_delimited(path)?,
        };

        if table.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ProcessingError::InvalidFormat(format!(
                "No header row in {}",
                path.display()
            )));
        }

        Ok(table)
    }

    /// First sheet of an xls/xlsx/ods workbook, first non-blank row as header
    fn read_workbook(&self, path: &Path) -> Result<RawTable> {
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names().to_vec();
        let first_sheet = sheet_names.first().ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("Workbook has no sheets: {}", path.display()))
        })?;

        let range = workbook.worksheet_range(first_sheet)?;
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(Cell::from_workbook).collect::<Vec<_>>())
            .skip_while(|row| row.iter().all(Cell::is_empty));

        let headers = rows
            .next()
            .ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Empty worksheet in {}", path.display()))
            })?
            .into_iter()
            .map(|cell| match cell {
                Cell::Text(s) => s,
                Cell::Number(n) => n.to_string(),
                Cell::DateTime(dt) => dt.to_string(),
                Cell::Empty => String::new(),
            })
            .collect();

        let rows = rows.filter(|row| !row.iter().all(Cell::is_empty)).collect();

        Ok(RawTable {
            source: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Delimited text in UTF-8 or Windows-1252, delimiter sniffed from the header
    fn read_delimited(&self, path: &Path) -> Result<RawTable> {
        let bytes = std::fs::read(path)?;
        let text = decode_text(&bytes);
        let delimiter = sniff_delimiter(&text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Vec<Cell> = record.iter().map(Cell::from_text).collect();
            if !row.iter().all(Cell::is_empty) {
                rows.push(row);
            }
        }

        Ok(RawTable {
            source: path.to_path_buf(),
            headers,
            rows,
        })
    }
}

/// Decode as UTF-8 (dropping a BOM), or as Windows-1252 when that fails
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// The candidate delimiter occurring most often in the first line
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|d| header.bytes().filter(|b| b == d).count())
        .filter(|d| header.as_bytes().contains(d))
        .unwrap_or(b',')
}

/// Spreadsheet serial day number (1900 date system) to a timestamp
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_cell_from_text() {
        assert_eq!(Cell::from_text("  "), Cell::Empty);
        assert_eq!(Cell::from_text("S/D"), Cell::Empty);
        assert_eq!(Cell::from_text("NaN"), Cell::Empty);
        assert_eq!(Cell::from_text(" 12.5 "), Cell::Text("12.5".to_string()));
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("fecha;temp;hum\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("fecha,temp,hum\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("fecha\ttemp\n"), b'\t');
        assert_eq!(sniff_delimiter("fecha\n"), b',');
    }

    #[test]
    fn test_decode_windows_1252() {
        // "Heliofanía" with a Latin-1 encoded "í"
        let bytes = b"Heliofan\xEDa";
        assert_eq!(decode_text(bytes), "Heliofanía");
        assert_eq!(decode_text("\u{feff}fecha".as_bytes()), "fecha");
    }

    #[test]
    fn test_excel_serial_to_datetime() {
        let dt = excel_serial_to_datetime(45_000.5).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 3, 15).unwrap());
        assert_eq!(dt.format("%H:%M").to_string(), "12:00");
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_read_delimited_file() -> Result<()> {
        let mut file = Builder::new().suffix(".csv").tempfile()?;
        writeln!(file, "Fecha;Temperatura_Abrigo_150cm;Rocio_Medio")?;
        writeln!(file, "2023-01-01;25,5;12")?;
        writeln!(file, ";;")?;
        writeln!(file, "2023-01-02;;s/d")?;

        let table = TableReader::new().read(file.path())?;

        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][1], Cell::Text("25,5".to_string()));
        assert_eq!(table.rows[1][1], Cell::Empty);
        assert_eq!(table.rows[1][2], Cell::Empty);
        Ok(())
    }

    #[test]
    fn test_load_unreadable_returns_none() -> Result<()> {
        let mut file = Builder::new().suffix(".xls").tempfile()?;
        file.write_all(&[0u8; 0])?;

        assert!(TableReader::new().load(file.path()).is_none());
        assert!(TableReader::new()
            .load(Path::new("/nonexistent/station.csv"))
            .is_none());
        Ok(())
    }
}
