use crate::error::Result;
use crate::models::{CanonicalRecord, Field};
use crate::writers::{field_columns, remark_column};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::utils::constants::DEFAULT_BUFFER_SIZE;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes canonical records as `station_id,timestamp,<field>,<field>_rmk,...`.
///
/// Null values are empty cells; a field a record does not carry leaves both
/// of its cells empty.
pub struct CsvWriter {
    fields: Option<Vec<Field>>,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { fields: None }
    }

    /// Fix the value columns instead of taking every field present.
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn write_records(&self, records: &[CanonicalRecord], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(records, BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))?;
        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    pub fn write_to<W: Write>(&self, records: &[CanonicalRecord], writer: W) -> Result<()> {
        let fields = match &self.fields {
            Some(fields) => fields.clone(),
            None => field_columns(records),
        };

        let mut csv = csv::Writer::from_writer(writer);

        let mut header = vec!["station_id".to_string(), "timestamp".to_string()];
        for field in &fields {
            header.push(field.as_str().to_string());
            header.push(remark_column(*field));
        }
        csv.write_record(&header)?;

        for record in records {
            let mut row = Vec::with_capacity(2 + 2 * fields.len());
            row.push(record.station_id.to_string());
            row.push(record.timestamp.format(TIMESTAMP_FORMAT).to_string());
            for field in &fields {
                match record.get(*field) {
                    Some(observation) => {
                        row.push(observation.value.map(format_value).unwrap_or_default());
                        row.push(observation.quality.as_u8().to_string());
                    }
                    None => {
                        row.push(String::new());
                        row.push(String::new());
                    }
                }
            }
            csv.write_record(&row)?;
        }

        csv.flush()?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shortest decimal form after rounding to 1e-6.
pub fn format_value(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}
