use crate::error::{ProcessingError, Result};
use crate::models::StationMetadata;
use crate::utils::coordinates::parse_coordinate;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;
use validator::Validate;

/// Catalog row as written: coordinates may be decimal or `DD:MM.m`.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    station_id: u32,
    name: String,
    #[serde(default)]
    name_jp: Option<String>,
    latitude: String,
    longitude: String,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    observation_start: Option<String>,
}

pub struct StationReader {
    skip_invalid: bool,
}

impl StationReader {
    pub fn new() -> Self {
        Self { skip_invalid: false }
    }

    /// Skip catalog rows that fail validation instead of aborting.
    pub fn with_skip_invalid(skip_invalid: bool) -> Self {
        Self { skip_invalid }
    }

    /// Read the station catalog CSV.
    pub fn read_stations(&self, path: &Path) -> Result<Vec<StationMetadata>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut stations = Vec::new();
        for result in reader.deserialize::<CatalogRow>() {
            let row = result?;
            match self.to_station(row) {
                Ok(station) => stations.push(station),
                Err(e) if self.skip_invalid => warn!("Skipping catalog entry: {}", e),
                Err(e) => return Err(e),
            }
        }

        Ok(stations)
    }

    fn to_station(&self, row: CatalogRow) -> Result<StationMetadata> {
        let latitude = parse_coordinate(&row.latitude)?;
        let longitude = parse_coordinate(&row.longitude)?;

        let mut station = StationMetadata::new(row.station_id, row.name, latitude, longitude);
        if let Some(name_jp) = row.name_jp.filter(|n| !n.is_empty()) {
            station = station.with_name_jp(name_jp);
        }
        if let Some(elevation) = row.elevation {
            station = station.with_elevation(elevation);
        }
        if let Some(start) = row.observation_start.filter(|s| !s.is_empty()) {
            let date = NaiveDate::parse_from_str(&start, "%Y-%m-%d").map_err(|_| {
                ProcessingError::InvalidFormat(format!(
                    "Invalid observation start for station {}: '{}'",
                    row.station_id, start
                ))
            })?;
            station = station.with_observation_start(date);
        }

        station.validate()?;
        Ok(station)
    }

    /// Read station metadata keyed by station id
    pub fn read_stations_map(&self, path: &Path) -> Result<HashMap<u32, StationMetadata>> {
        let stations = self.read_stations(path)?;
        let mut map = HashMap::with_capacity(stations.len());

        for station in stations {
            map.insert(station.station_id, station);
        }

        Ok(map)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn catalog(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "station_id,name,name_jp,latitude,longitude,elevation,observation_start"
        )
        .unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_read_stations_file() -> Result<()> {
        let file = catalog(&[
            "662,Tokyo,東京,35:41.5,139:45.0,25.2,1961-01-01",
            "412,Sapporo,札幌,43.06,141.3283,,",
        ]);

        let stations = StationReader::new().read_stations(file.path())?;

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].station_id, 662);
        assert_eq!(stations[0].name_jp.as_deref(), Some("東京"));
        assert!((stations[0].latitude - 35.691667).abs() < 0.00001);
        assert_eq!(
            stations[0].observation_start,
            NaiveDate::from_ymd_opt(1961, 1, 1)
        );
        assert_eq!(stations[1].elevation, None);
        assert_eq!(stations[1].observation_start, None);

        Ok(())
    }

    #[test]
    fn test_invalid_station_handling() {
        let file = catalog(&["1,Nowhere,,51.5,139.0,,", "662,Tokyo,東京,35.69,139.75,25.2,"]);

        assert!(StationReader::new().read_stations(file.path()).is_err());

        let stations = StationReader::with_skip_invalid(true)
            .read_stations(file.path())
            .unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].station_id, 662);
    }
}
