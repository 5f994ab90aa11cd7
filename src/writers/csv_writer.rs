use crate::error::Result;
use crate::models::DailyRecord;
use std::path::Path;
use tracing::debug;

/// Writes daily records as a headed CSV table, one row per station-day.
#[derive(Debug, Clone, Copy)]
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn write_records(&self, records: &[DailyRecord], path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(path)?;

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    pub fn read_records(&self, path: &Path) -> Result<Vec<DailyRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        let mut records = Vec::new();
        for record in reader.deserialize() {
            records.push(record?);
        }
        Ok(records)
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
