use crate::error::Result;
use crate::models::{CanonicalRecord, StationMetadata, StationSeries};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Groups normalized records into one validated series per station.
pub struct SeriesMerger {
    dedupe: bool,
}

impl SeriesMerger {
    pub fn new() -> Self {
        Self { dedupe: false }
    }

    /// When set, a repeated timestamp keeps the record read last instead of
    /// failing the station.
    pub fn with_dedupe(dedupe: bool) -> Self {
        Self { dedupe }
    }

    /// Merge records of any number of stations, in input order, into series
    /// sorted by station id.
    pub fn merge(
        &self,
        records: Vec<CanonicalRecord>,
        stations: &HashMap<u32, StationMetadata>,
    ) -> Result<Vec<StationSeries>> {
        let grouped = self.group_by_station(records);

        let mut series = Vec::with_capacity(grouped.len());
        for (station_id, records) in grouped {
            series.push(self.build_series(station_id, records, stations.get(&station_id))?);
        }

        debug!("Merged records into {} station series", series.len());
        Ok(series)
    }

    fn group_by_station(
        &self,
        records: Vec<CanonicalRecord>,
    ) -> BTreeMap<u32, Vec<CanonicalRecord>> {
        let mut grouped: BTreeMap<u32, Vec<CanonicalRecord>> = BTreeMap::new();
        for record in records {
            grouped.entry(record.station_id).or_default().push(record);
        }
        grouped
    }

    fn build_series(
        &self,
        station_id: u32,
        mut records: Vec<CanonicalRecord>,
        station: Option<&StationMetadata>,
    ) -> Result<StationSeries> {
        // Stable sort: among equal timestamps the later input stays later.
        records.sort_by_key(|r| r.timestamp);

        if self.dedupe {
            let before = records.len();
            records = keep_last_per_timestamp(records);
            let dropped = before - records.len();
            if dropped > 0 {
                warn!(
                    "Station {}: dropped {} duplicate timestamps",
                    station_id, dropped
                );
            }
        }

        let mut series = StationSeries::from_records(station_id, records)?;

        match station.and_then(|s| s.observation_start) {
            Some(start) => series = series.with_observation_start(start),
            None if station.is_none() => {
                debug!("Station {} not in catalog", station_id);
            }
            None => {}
        }

        Ok(series)
    }
}

fn keep_last_per_timestamp(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut kept: Vec<CanonicalRecord> = Vec::with_capacity(records.len());
    for record in records {
        match kept.last_mut() {
            Some(last) if last.timestamp == record.timestamp => *last = record,
            _ => kept.push(record),
        }
    }
    kept
}

impl Default for SeriesMerger {
    fn default() -> Self {
        Self::new()
    }
}
