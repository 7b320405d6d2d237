use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::field::{Field, Resolution, DAILY_FIELDS, HOURLY_FIELDS};
use crate::models::quality::QualityCode;

/// Timestamp of a labelled (date, hour) pair. Hour 24 is midnight of the
/// next day; it is the only representation of that instant in a series.
pub fn canonical_timestamp(date: NaiveDate, hour: u32) -> Option<NaiveDateTime> {
    match hour {
        24 => date.succ_opt()?.and_hms_opt(0, 0, 0),
        0..=23 => date.and_hms_opt(hour, 0, 0),
        _ => None,
    }
}

/// Input encodings understood by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// Hourly archive: scaled integers each followed by a one-digit remark code.
    LegacyArchive,
    /// Daily archive, same encoding as the hourly one.
    LegacyDailyArchive,
    /// Web observation tables: physical units with sentinel symbols.
    ModernWeb,
}

impl SourceFormat {
    pub fn fields(&self) -> &'static [Field] {
        match self {
            SourceFormat::LegacyArchive | SourceFormat::ModernWeb => &HOURLY_FIELDS,
            SourceFormat::LegacyDailyArchive => &DAILY_FIELDS,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            SourceFormat::LegacyArchive | SourceFormat::ModernWeb => Resolution::Hourly,
            SourceFormat::LegacyDailyArchive => Resolution::Daily,
        }
    }
}

/// One undecoded input row as handed over by a reader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line position in the source file.
    pub line: usize,
    /// Station identity supplied by the collaborator when the row lacks one.
    pub station_id: Option<u32>,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self {
            line,
            station_id: None,
            cells,
        }
    }

    pub fn with_station_id(mut self, station_id: u32) -> Self {
        self.station_id = Some(station_id);
        self
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|s| s.as_str())
    }
}

/// A physical value and the remark code explaining it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub value: Option<f64>,
    pub quality: QualityCode,
}

impl Observation {
    pub fn new(value: Option<f64>, quality: QualityCode) -> Self {
        Self { value, quality }
    }

    pub fn observed(value: f64, quality: QualityCode) -> Self {
        Self {
            value: Some(value),
            quality,
        }
    }

    pub fn null(quality: QualityCode) -> Self {
        Self {
            value: None,
            quality,
        }
    }

    pub fn not_created() -> Self {
        Self::null(QualityCode::NotCreated)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// A value that came from the archive rather than from the resampler.
    pub fn is_original_value(&self) -> bool {
        self.value.is_some() && self.quality != QualityCode::Interpolated
    }
}

/// Normalized observations of one station at one instant, in physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub station_id: u32,
    pub timestamp: NaiveDateTime,
    observations: BTreeMap<Field, Observation>,
}

impl CanonicalRecord {
    pub fn new(station_id: u32, timestamp: NaiveDateTime) -> Self {
        Self {
            station_id,
            timestamp,
            observations: BTreeMap::new(),
        }
    }

    /// A record standing in for a timestamp the archive never produced.
    pub fn synthesized(station_id: u32, timestamp: NaiveDateTime, fields: &[Field]) -> Self {
        let observations = fields
            .iter()
            .map(|field| (*field, Observation::not_created()))
            .collect();
        Self {
            station_id,
            timestamp,
            observations,
        }
    }

    pub fn set(&mut self, field: Field, observation: Observation) {
        self.observations.insert(field, observation);
    }

    pub fn get(&self, field: Field) -> Option<Observation> {
        self.observations.get(&field).copied()
    }

    pub fn value(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(|o| o.value)
    }

    pub fn quality(&self, field: Field) -> Option<QualityCode> {
        self.get(field).map(|o| o.quality)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.observations.keys().copied()
    }

    pub fn observations(&self) -> impl Iterator<Item = (Field, Observation)> + '_ {
        self.observations.iter().map(|(f, o)| (*f, *o))
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.observations.keys().next().map(|f| f.resolution())
    }

    /// True when every null carries an absence code.
    pub fn has_valid_nulls(&self) -> bool {
        self.observations
            .values()
            .all(|o| o.value.is_some() || o.quality.is_absence())
    }

    /// True when zeros implied by "phenomenon absent" codes are not tagged normal.
    pub fn has_valid_zero_tags(&self) -> bool {
        self.observations.iter().all(|(field, o)| {
            !field.family().is_accumulative()
                || o.value != Some(0.0)
                || o.quality != QualityCode::NotCreated && o.quality != QualityCode::Missing
        })
    }
}
