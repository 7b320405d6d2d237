use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalRecord, Field, Observation, QualityCode, StationSeries};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::{field_columns, remark_column};
use arrow::array::{
    Array, ArrayRef, Float64Array, TimestampSecondArray, UInt32Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field as ArrowField, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Writes canonical records with one Float64 value column and one UInt8
/// remark column per field.
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
        self.row_group_size = size.max(1);
        self
    }

    pub fn write_records(&self, records: &[CanonicalRecord], path: &Path) -> Result<()> {
        let fields = field_columns(records);
        let schema = create_schema(&fields);

        let mut writer = ArrowWriter::try_new(File::create(path)?, schema.clone(), Some(self.properties()))?;
        if !records.is_empty() {
            writer.write(&records_to_batch(records, &fields, schema)?)?;
        }
        writer.close()?;
        Ok(())
    }

    /// Write several stations into one file, one batch per station.
    pub fn write_series(&self, series: &[StationSeries], path: &Path) -> Result<()> {
        let fields = field_columns(series.iter().flat_map(|s| s.records()));
        let schema = create_schema(&fields);

        let mut writer = ArrowWriter::try_new(File::create(path)?, schema.clone(), Some(self.properties()))?;
        let mut rows = 0;
        for station in series.iter().filter(|s| !s.is_empty()) {
            writer.write(&records_to_batch(station.records(), &fields, schema.clone())?)?;
            rows += station.len();
        }
        writer.close()?;

        debug!(
            "Wrote {} rows for {} stations to {}",
            rows,
            series.len(),
            path.display()
        );
        Ok(())
    }

    fn properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }

    /// Read records back, up to `limit`.
    pub fn read_records(&self, path: &Path, limit: usize) -> Result<Vec<CanonicalRecord>> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?
            .with_batch_size(limit.clamp(1, 8192))
            .build()?;

        let mut records = Vec::new();
        for batch in reader {
            let batch = batch?;
            batch_to_records(&batch, limit - records.len(), &mut records)?;
            if records.len() >= limit {
                break;
            }
        }
        Ok(records)
    }

    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let reader = SerializedFileReader::new(File::open(path)?)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size: std::fs::metadata(path)?.len(),
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn create_schema(fields: &[Field]) -> Arc<Schema> {
    let mut columns = vec![
        ArrowField::new("station_id", DataType::UInt32, false),
        ArrowField::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Second, None),
            false,
        ),
    ];
    for field in fields {
        columns.push(ArrowField::new(field.as_str(), DataType::Float64, true));
        columns.push(ArrowField::new(remark_column(*field), DataType::UInt8, true));
    }
    Arc::new(Schema::new(columns))
}

fn records_to_batch(
    records: &[CanonicalRecord],
    fields: &[Field],
    schema: Arc<Schema>,
) -> Result<RecordBatch> {
    let station_ids: Vec<u32> = records.iter().map(|r| r.station_id).collect();
    let timestamps: Vec<i64> = records
        .iter()
        .map(|r| r.timestamp.and_utc().timestamp())
        .collect();

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from(station_ids)),
        Arc::new(TimestampSecondArray::from(timestamps)),
    ];
    for field in fields {
        let observations: Vec<Option<Observation>> =
            records.iter().map(|r| r.get(*field)).collect();
        let values: Vec<Option<f64>> = observations
            .iter()
            .map(|o| o.and_then(|o| o.value))
            .collect();
        let remarks: Vec<Option<u8>> = observations
            .iter()
            .map(|o| o.map(|o| o.quality.as_u8()))
            .collect();
        columns.push(Arc::new(Float64Array::from(values)));
        columns.push(Arc::new(UInt8Array::from(remarks)));
    }

    Ok(RecordBatch::try_new(schema, columns)?)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    let index = batch.schema().index_of(name)?;
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("unexpected type of column {}", name)))
}

fn batch_to_records(
    batch: &RecordBatch,
    limit: usize,
    records: &mut Vec<CanonicalRecord>,
) -> Result<()> {
    let station_ids = column::<UInt32Array>(batch, "station_id")?;
    let timestamps = column::<TimestampSecondArray>(batch, "timestamp")?;

    let schema = batch.schema();
    let mut field_columns = Vec::new();
    for arrow_field in schema.fields() {
        if let Some(field) = Field::from_name(arrow_field.name()) {
            let values = column::<Float64Array>(batch, field.as_str())?;
            let remarks = column::<UInt8Array>(batch, &remark_column(field))?;
            field_columns.push((field, values, remarks));
        }
    }

    for row in 0..batch.num_rows().min(limit) {
        let timestamp = DateTime::from_timestamp(timestamps.value(row), 0)
            .ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("timestamp out of range in row {}", row))
            })?
            .naive_utc();
        let mut record = CanonicalRecord::new(station_ids.value(row), timestamp);

        for (field, values, remarks) in &field_columns {
            if remarks.is_null(row) {
                continue;
            }
            let quality = QualityCode::from_u8(remarks.value(row)).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!(
                    "invalid remark {} for {}",
                    remarks.value(row),
                    field
                ))
            })?;
            let value = (!values.is_null(row)).then(|| values.value(row));
            record.set(*field, Observation::new(value, quality));
        }
        records.push(record);
    }
    Ok(())
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
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}
