use crate::models::Field;

/// First day of hourly observation at most stations; 3-hourly before it.
pub const DEFAULT_HOURLY_CUTOVER: (i32, u32, u32) = (1991, 1, 1);

/// Native spacing of the archive before the cutover.
pub const LEGACY_INTERVAL_HOURS: i64 = 3;

/// Hours (of the labelled 1-24 clock) at which cloud cover is observed.
pub const CLOUD_OBSERVATION_HOURS: [u32; 8] = [3, 6, 9, 12, 15, 18, 21, 24];

pub const DEFAULT_MAX_INTERPOLATION_GAP_HOURS: u32 = 3;

/// Column counts of the two legacy layouts.
pub const LEGACY_HOURLY_COLUMNS: usize = 33;
pub const LEGACY_DAILY_COLUMNS: usize = 52;

/// Sentinels of the web observation tables.
pub const SENTINEL_NO_PHENOMENON: &str = "--";
pub const SENTINEL_MISSING: &str = "///";
pub const SENTINEL_MISSING_CROSS: &str = "×";
pub const UNCERTAIN_MARKERS: [char; 3] = [')', ']', '#'];
pub const FULLWIDTH_MINUS: char = '−';

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";

/// Plausible physical range of a field, used by the integrity checker.
pub fn physical_bounds(field: Field) -> Option<(f64, f64)> {
    use Field::*;

    let bounds = match field {
        LocalPressure | MeanLocalPressure => (500.0, 1100.0),
        SeaLevelPressure | MeanSeaLevelPressure | MinSeaLevelPressure => (850.0, 1090.0),
        Temperature | DewPoint | MeanTemperature | MaxTemperature | MinTemperature => {
            (-45.0, 45.0)
        }
        VaporPressure | MeanVaporPressure => (0.0, 80.0),
        RelativeHumidity | MeanHumidity | MinHumidity | CloudCover | MeanCloudCover => (0.0, 1.0),
        WindDirection | MaxWindDirection | MaxGustDirection => (0.0, 360.0),
        WindSpeed | MeanWindSpeed | MaxWindSpeed => (0.0, 75.0),
        MaxGustSpeed => (0.0, 100.0),
        WindU | WindV => (-75.0, 75.0),
        SunshineDuration => (0.0, 1.0),
        DailySunshine => (0.0, 24.0),
        SolarRadiation => (0.0, 1400.0),
        DailySolarRadiation => (0.0, 500.0),
        Precipitation | MaxHourlyPrecipitation => (0.0, 200.0),
        Max10MinPrecipitation => (0.0, 60.0),
        DailyPrecipitation => (0.0, 1000.0),
        Evaporation => (0.0, 20.0),
        Snowfall | DailySnowfall => (0.0, 250.0),
        SnowDepth | MaxSnowDepth => (0.0, 1200.0),
        WeatherCode => return None,
    };
    Some(bounds)
}

/// Hour-to-hour change beyond which a continuous value is reported as suspicious.
pub fn max_hourly_change(field: Field) -> Option<f64> {
    match field {
        Field::Temperature | Field::DewPoint => Some(10.0),
        Field::LocalPressure | Field::SeaLevelPressure => Some(10.0),
        Field::RelativeHumidity => Some(0.6),
        _ => None,
    }
}
