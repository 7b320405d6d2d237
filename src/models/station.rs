use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Station catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    pub station_id: u32,

    #[validate(length(min = 1))]
    pub name: String,

    /// Station name as printed in the archive (Japanese).
    pub name_jp: Option<String>,

    #[validate(range(min = 20.0, max = 46.0))]
    pub latitude: f64,

    #[validate(range(min = 122.0, max = 154.0))]
    pub longitude: f64,

    pub elevation: Option<f64>,

    /// First day of continuous observation; gap filling starts here.
    pub observation_start: Option<NaiveDate>,
}

impl StationMetadata {
    pub fn new(station_id: u32, name: String, latitude: f64, longitude: f64) -> Self {
        Self {
            station_id,
            name,
            name_jp: None,
            latitude,
            longitude,
            elevation: None,
            observation_start: None,
        }
    }

    pub fn with_name_jp(mut self, name_jp: impl Into<String>) -> Self {
        self.name_jp = Some(name_jp.into());
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_observation_start(mut self, date: NaiveDate) -> Self {
        self.observation_start = Some(date);
        self
    }

    /// Matches either the romanised or the Japanese name.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.name_jp.as_deref() == Some(name)
    }
}
