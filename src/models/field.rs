//! Canonical field catalogue: every physical quantity the archives carry, with
//! its family, native resolution and unit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interpolation and null/zero policy class of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFamily {
    /// Linearly interpolatable state variables.
    Continuous,
    /// Totals over the observing interval.
    Accumulative,
    /// Sunshine and solar radiation totals; not observed at night or out of
    /// season means nothing was received.
    Radiative,
    /// Observed only every three hours, even in the hourly era.
    Discrete,
}

impl FieldFamily {
    /// Totals of either kind. These are never interpolated.
    pub fn is_accumulative(&self) -> bool {
        matches!(self, FieldFamily::Accumulative | FieldFamily::Radiative)
    }
}

/// Native time resolution of the archive a field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Hourly,
    Daily,
}

/// Canonical physical fields of the hourly and daily archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    // Hourly
    LocalPressure,
    SeaLevelPressure,
    Temperature,
    VaporPressure,
    RelativeHumidity,
    WindDirection,
    WindSpeed,
    CloudCover,
    WeatherCode,
    DewPoint,
    SunshineDuration,
    SolarRadiation,
    Precipitation,
    Snowfall,
    SnowDepth,
    WindU,
    WindV,

    // Daily
    MeanLocalPressure,
    MeanSeaLevelPressure,
    MinSeaLevelPressure,
    MeanTemperature,
    MaxTemperature,
    MinTemperature,
    MeanVaporPressure,
    MeanHumidity,
    MinHumidity,
    MeanWindSpeed,
    MaxWindSpeed,
    MaxWindDirection,
    MaxGustSpeed,
    MaxGustDirection,
    MeanCloudCover,
    DailySunshine,
    DailySolarRadiation,
    Evaporation,
    DailyPrecipitation,
    MaxHourlyPrecipitation,
    Max10MinPrecipitation,
    DailySnowfall,
    MaxSnowDepth,
}

/// Field set of every hourly canonical record, in output column order.
pub const HOURLY_FIELDS: [Field; 17] = [
    Field::LocalPressure,
    Field::SeaLevelPressure,
    Field::Temperature,
    Field::VaporPressure,
    Field::RelativeHumidity,
    Field::WindDirection,
    Field::WindSpeed,
    Field::CloudCover,
    Field::WeatherCode,
    Field::DewPoint,
    Field::SunshineDuration,
    Field::SolarRadiation,
    Field::Precipitation,
    Field::Snowfall,
    Field::SnowDepth,
    Field::WindU,
    Field::WindV,
];

/// Field set of every daily canonical record, in archive order.
pub const DAILY_FIELDS: [Field; 23] = [
    Field::MeanLocalPressure,
    Field::MeanSeaLevelPressure,
    Field::MinSeaLevelPressure,
    Field::MeanTemperature,
    Field::MaxTemperature,
    Field::MinTemperature,
    Field::MeanVaporPressure,
    Field::MeanHumidity,
    Field::MinHumidity,
    Field::MeanWindSpeed,
    Field::MaxWindSpeed,
    Field::MaxWindDirection,
    Field::MaxGustSpeed,
    Field::MaxGustDirection,
    Field::MeanCloudCover,
    Field::DailySunshine,
    Field::DailySolarRadiation,
    Field::Evaporation,
    Field::DailyPrecipitation,
    Field::MaxHourlyPrecipitation,
    Field::Max10MinPrecipitation,
    Field::DailySnowfall,
    Field::MaxSnowDepth,
];

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::LocalPressure => "local_pressure",
            Field::SeaLevelPressure => "sea_level_pressure",
            Field::Temperature => "temperature",
            Field::VaporPressure => "vapor_pressure",
            Field::RelativeHumidity => "relative_humidity",
            Field::WindDirection => "wind_direction",
            Field::WindSpeed => "wind_speed",
            Field::CloudCover => "cloud_cover",
            Field::WeatherCode => "weather_code",
            Field::DewPoint => "dew_point",
            Field::SunshineDuration => "sunshine_duration",
            Field::SolarRadiation => "solar_radiation",
            Field::Precipitation => "precipitation",
            Field::Snowfall => "snowfall",
            Field::SnowDepth => "snow_depth",
            Field::WindU => "wind_u",
            Field::WindV => "wind_v",
            Field::MeanLocalPressure => "mean_local_pressure",
            Field::MeanSeaLevelPressure => "mean_sea_level_pressure",
            Field::MinSeaLevelPressure => "min_sea_level_pressure",
            Field::MeanTemperature => "mean_temperature",
            Field::MaxTemperature => "max_temperature",
            Field::MinTemperature => "min_temperature",
            Field::MeanVaporPressure => "mean_vapor_pressure",
            Field::MeanHumidity => "mean_humidity",
            Field::MinHumidity => "min_humidity",
            Field::MeanWindSpeed => "mean_wind_speed",
            Field::MaxWindSpeed => "max_wind_speed",
            Field::MaxWindDirection => "max_wind_direction",
            Field::MaxGustSpeed => "max_gust_speed",
            Field::MaxGustDirection => "max_gust_direction",
            Field::MeanCloudCover => "mean_cloud_cover",
            Field::DailySunshine => "daily_sunshine",
            Field::DailySolarRadiation => "daily_solar_radiation",
            Field::Evaporation => "evaporation",
            Field::DailyPrecipitation => "daily_precipitation",
            Field::MaxHourlyPrecipitation => "max_hourly_precipitation",
            Field::Max10MinPrecipitation => "max_10min_precipitation",
            Field::DailySnowfall => "daily_snowfall",
            Field::MaxSnowDepth => "max_snow_depth",
        }
    }

    pub fn family(&self) -> FieldFamily {
        match self {
            Field::CloudCover | Field::WeatherCode | Field::MeanCloudCover => FieldFamily::Discrete,

            Field::SunshineDuration
            | Field::SolarRadiation
            | Field::DailySunshine
            | Field::DailySolarRadiation => FieldFamily::Radiative,

            Field::Precipitation
            | Field::Snowfall
            | Field::SnowDepth
            | Field::Evaporation
            | Field::DailyPrecipitation
            | Field::MaxHourlyPrecipitation
            | Field::Max10MinPrecipitation
            | Field::DailySnowfall
            | Field::MaxSnowDepth => FieldFamily::Accumulative,

            _ => FieldFamily::Continuous,
        }
    }

    pub fn resolution(&self) -> Resolution {
        if HOURLY_FIELDS.contains(self) {
            Resolution::Hourly
        } else {
            Resolution::Daily
        }
    }

    /// Physical unit of the canonical value.
    pub fn unit(&self) -> &'static str {
        match self {
            Field::LocalPressure
            | Field::SeaLevelPressure
            | Field::VaporPressure
            | Field::MeanLocalPressure
            | Field::MeanSeaLevelPressure
            | Field::MinSeaLevelPressure
            | Field::MeanVaporPressure => "hPa",
            Field::Temperature
            | Field::DewPoint
            | Field::MeanTemperature
            | Field::MaxTemperature
            | Field::MinTemperature => "degC",
            Field::RelativeHumidity
            | Field::MeanHumidity
            | Field::MinHumidity
            | Field::CloudCover
            | Field::MeanCloudCover => "fraction",
            Field::WindDirection | Field::MaxWindDirection | Field::MaxGustDirection => "deg",
            Field::WindSpeed
            | Field::WindU
            | Field::WindV
            | Field::MeanWindSpeed
            | Field::MaxWindSpeed
            | Field::MaxGustSpeed => "m/s",
            Field::WeatherCode => "code",
            Field::SunshineDuration | Field::DailySunshine => "h",
            Field::SolarRadiation | Field::DailySolarRadiation => "W/m2",
            Field::Precipitation => "mm/h",
            Field::Evaporation
            | Field::DailyPrecipitation
            | Field::MaxHourlyPrecipitation
            | Field::Max10MinPrecipitation => "mm",
            Field::Snowfall | Field::SnowDepth | Field::DailySnowfall | Field::MaxSnowDepth => {
                "cm"
            }
        }
    }

    /// Fields computed from other fields rather than read from an archive.
    pub fn is_derived(&self) -> bool {
        matches!(self, Field::WindU | Field::WindV)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        HOURLY_FIELDS
            .iter()
            .chain(DAILY_FIELDS.iter())
            .copied()
            .find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
