//! Encoding of canonical hourly records back into 33-column archive rows.
//!
//! Values are scaled with the unit rules in force on the row's labelled date,
//! so a record at 00:00 is written as hour 24 of the previous day and scaled
//! by that day's rules. Interpolated values are written as normal observations
//! (remark 8) so that they read back as values; nulls are written as 0.

use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalRecord, QualityCode, Resolution, StationMetadata};
use crate::processors::labelled_date_hour;
use crate::processors::normalizer::LEGACY_HOURLY_LAYOUT;
use crate::readers::TextEncoding;
use crate::utils::constants::LEGACY_HOURLY_COLUMNS;
use crate::utils::units;
use chrono::Datelike;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Remark written for values the resampler produced. Remark 2 would make
/// the value read back as null.
const INTERPOLATED_REMARK: u8 = 8;

pub struct LegacyWriter {
    station_names: HashMap<u32, String>,
    encoding: TextEncoding,
}

impl LegacyWriter {
    pub fn new() -> Self {
        Self {
            station_names: HashMap::new(),
            encoding: TextEncoding::Utf8,
        }
    }

    /// Fill the name column from the station catalog.
    pub fn with_stations(mut self, stations: &HashMap<u32, StationMetadata>) -> Self {
        self.station_names = stations
            .iter()
            .map(|(id, s)| (*id, s.name_jp.clone().unwrap_or_else(|| s.name.clone())))
            .collect();
        self
    }

    /// `Auto` writes UTF-8.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn write_records(&self, records: &[CanonicalRecord], path: &Path) -> Result<()> {
        let bytes = self.encode_records(records)?;
        fs::write(path, bytes)?;
        debug!("Wrote {} archive rows to {}", records.len(), path.display());
        Ok(())
    }

    /// Encode records as archive text in the configured encoding.
    pub fn encode_records(&self, records: &[CanonicalRecord]) -> Result<Vec<u8>> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        for record in records {
            csv.write_record(self.encode_row(record)?)?;
        }
        let text = csv
            .into_inner()
            .map_err(|e| ProcessingError::Io(e.into_error()))?;

        match self.encoding {
            TextEncoding::ShiftJis => {
                let text = String::from_utf8_lossy(&text);
                let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(&text);
                if had_errors {
                    warn!("Some characters have no Shift_JIS form and were replaced");
                }
                Ok(bytes.into_owned())
            }
            TextEncoding::Utf8 | TextEncoding::Auto => Ok(text),
        }
    }

    /// Encode one hourly record as the 33 cells of an archive row.
    pub fn encode_row(&self, record: &CanonicalRecord) -> Result<Vec<String>> {
        if record.resolution() == Some(Resolution::Daily) {
            return Err(ProcessingError::InvalidFormat(format!(
                "station {} at {}: daily records have no hourly archive row",
                record.station_id, record.timestamp
            )));
        }

        let (date, hour) = labelled_date_hour(record.timestamp);
        let station = record.station_id.to_string();
        let name = self
            .station_names
            .get(&record.station_id)
            .cloned()
            .unwrap_or_default();

        let mut cells = Vec::with_capacity(LEGACY_HOURLY_COLUMNS);
        cells.extend([
            station.clone(),
            name,
            station,
            date.year().to_string(),
            date.month().to_string(),
            date.day().to_string(),
            hour.to_string(),
        ]);

        for (field, _) in LEGACY_HOURLY_LAYOUT {
            let (raw, remark) = match record.get(field) {
                None => (0, QualityCode::NotCreated.as_u8()),
                Some(observation) => {
                    let remark = match observation.quality {
                        QualityCode::Interpolated => INTERPOLATED_REMARK,
                        code => code.as_u8(),
                    };
                    let raw = match observation.value {
                        Some(value) => units::to_raw(field, value, date)?,
                        None => 0,
                    };
                    (raw, remark)
                }
            };
            cells.push(raw.to_string());
            cells.push(remark.to_string());
        }

        Ok(cells)
    }
}

impl Default for LegacyWriter {
    fn default() -> Self {
        Self::new()
    }
}
