use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{IntegrityViolation, ProcessingError, Result};
use crate::models::field::Resolution;
use crate::models::record::CanonicalRecord;

/// Time-ordered canonical records of a single station.
///
/// Construction validates that timestamps are strictly increasing and that
/// every record belongs to the same station, so consumers never re-check.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeries {
    station_id: u32,
    observation_start: Option<NaiveDateTime>,
    records: Vec<CanonicalRecord>,
}

impl StationSeries {
    pub fn from_records(station_id: u32, records: Vec<CanonicalRecord>) -> Result<Self> {
        validate_records(station_id, &records)?;
        Ok(Self {
            station_id,
            observation_start: None,
            records,
        })
    }

    /// Start of continuous observation; gap filling begins at midnight of this day.
    pub fn with_observation_start(mut self, date: NaiveDate) -> Self {
        self.observation_start = date.and_hms_opt(0, 0, 0);
        self
    }

    pub fn station_id(&self) -> u32 {
        self.station_id
    }

    pub fn observation_start(&self) -> Option<NaiveDateTime> {
        self.observation_start
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.records.iter().find_map(|r| r.resolution())
    }

    pub fn into_records(self) -> Vec<CanonicalRecord> {
        self.records
    }
}

fn validate_records(station_id: u32, records: &[CanonicalRecord]) -> Result<()> {
    let mut previous: Option<NaiveDateTime> = None;
    for record in records {
        if record.station_id != station_id {
            return Err(ProcessingError::SeriesIntegrity {
                station_id,
                timestamp: record.timestamp,
                violation: IntegrityViolation::ForeignStation(record.station_id),
            });
        }
        if let Some(prev) = previous {
            let violation = if record.timestamp == prev {
                Some(IntegrityViolation::Duplicate)
            } else if record.timestamp < prev {
                Some(IntegrityViolation::OutOfOrder)
            } else {
                None
            };
            if let Some(violation) = violation {
                return Err(ProcessingError::SeriesIntegrity {
                    station_id,
                    timestamp: record.timestamp,
                    violation,
                });
            }
        }
        previous = Some(record.timestamp);
    }
    Ok(())
}
