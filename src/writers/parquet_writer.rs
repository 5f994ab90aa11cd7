use crate::error::{ProcessingError, Result};
use crate::models::{DailyRecord, Variable};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Days between 0001-01-01 and 1970-01-01, the Date32 epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write daily records to a Parquet file
    pub fn write_records(&self, records: &[DailyRecord], path: &Path) -> Result<()> {
        self.write_records_batched(records, path, records.len().max(1))
    }

    /// Write records in batches for memory efficiency
    pub fn write_records_batched(
        &self,
        records: &[DailyRecord],
        path: &Path,
        batch_size: usize,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let schema = Self::schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in records.chunks(batch_size.max(1)) {
            let batch = Self::records_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    /// `station_id`, `date`, then the canonical variables in order
    pub fn schema() -> Arc<Schema> {
        let mut fields = vec![
            Field::new("station_id", DataType::Utf8, false),
            Field::new("date", DataType::Date32, false),
        ];
        fields.extend(
            Variable::ALL
                .iter()
                .map(|v| Field::new(v.name(), DataType::Float64, false)),
        );

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(records: &[DailyRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let station_ids: Vec<&str> = records.iter().map(|r| r.station_id.as_str()).collect();
        let dates: Vec<i32> = records
            .iter()
            .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(station_ids)),
            Arc::new(Date32Array::from(dates)),
        ];
        for variable in Variable::ALL {
            let values: Vec<f64> = records.iter().map(|r| r.get(variable)).collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Read up to `limit` records back from a Parquet file
    pub fn read_sample_records(&self, path: &Path, limit: usize) -> Result<Vec<DailyRecord>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;

            let station_ids: &StringArray = typed_column(&batch, "station_id")?;
            let dates: &Date32Array = typed_column(&batch, "date")?;
            let variables = Variable::ALL
                .iter()
                .map(|v| typed_column::<Float64Array>(&batch, v.name()))
                .collect::<Result<Vec<_>>>()?;

            for i in 0..batch.num_rows() {
                if records.len() >= limit {
                    return Ok(records);
                }

                let date = NaiveDate::from_num_days_from_ce_opt(
                    dates.value(i) + UNIX_EPOCH_DAYS_FROM_CE,
                )
                .ok_or_else(|| {
                    ProcessingError::InvalidFormat("Invalid date in Parquet file".to_string())
                })?;

                let mut values = [0.0; 10];
                for (slot, array) in values.iter_mut().zip(&variables) {
                    *slot = array.value(i);
                }

                records.push(DailyRecord::from_values(
                    station_ids.value(i).to_string(),
                    date,
                    values,
                ));
            }
        }

        Ok(records)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
        })
    }
}

fn typed_column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0, // Convert to MB
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}
