use crate::error::{ProcessingError, Result};
use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    /// Pick the output format from the file extension (Parquet unless `.csv`)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("csv") => OutputFormat::Csv,
            _ => OutputFormat::Parquet,
        }
    }
}

/// Station identifier from a report path (e.g., data/estaciones/12345.xls -> 12345)
pub fn station_id_from_path(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .unwrap_or_default();

    if stem.is_empty() {
        return Err(ProcessingError::InvalidFormat(format!(
            "Cannot derive station id from path: {}",
            path.display()
        )));
    }

    Ok(stem.to_string())
}

/// Generate default output filename with format: clima-daily-{YYMMDD}.parquet
pub fn generate_default_output_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!("clima-daily-{:02}{:02}{:02}.parquet", year, month, day);
    PathBuf::from("output").join(filename)
}
