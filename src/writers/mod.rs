pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};

use crate::error::Result;
use crate::models::DailyRecord;
use crate::utils::filename::OutputFormat;
use crate::utils::constants::DEFAULT_CHUNK_SIZE;
use std::path::Path;

/// Write records in the format implied by the output path
pub fn write_output(records: &[DailyRecord], path: &Path, compression: &str) -> Result<OutputFormat> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let format = OutputFormat::from_path(path);
    match format {
        OutputFormat::Csv => CsvWriter::new().write_records(records, path)?,
        OutputFormat::Parquet => ParquetWriter::new()
            .with_compression(compression)?
            .write_records_batched(records, path, DEFAULT_CHUNK_SIZE)?,
    }
    Ok(format)
}
