//! Conversions between archive integers and physical units.
//!
//! Rules are keyed by field and, for daily solar radiation and minimum
//! sea-level pressure, by the labelled date of the observation. A field/date with no
//! rule is an error; there is no identity fallback.

use chrono::{Datelike, NaiveDate};

use crate::error::{ProcessingError, Result};
use crate::models::wind;
use crate::models::{Field, Resolution};

/// Offset the daily archive added to minimum sea-level pressure up to 2002.
pub const MIN_SLP_OFFSET: i64 = 10_000;
pub const MIN_SLP_OFFSET_LAST_YEAR: i32 = 2002;
/// Scaled values below this (500.0 hPa) are taken to have lost the offset.
const MIN_SLP_OFFSET_THRESHOLD: i64 = 5_000;

const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Raw solar radiation unit of one archive era, in J/m².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarEpoch {
    pub resolution: Resolution,
    pub start: (i32, u32, u32),
    pub joules_per_unit: f64,
    pub label: &'static str,
}

/// Solar radiation eras per archive, oldest first. Each runs until the next
/// one of the same resolution starts.
pub const SOLAR_EPOCHS: [SolarEpoch; 3] = [
    SolarEpoch {
        resolution: Resolution::Hourly,
        start: (1961, 1, 1),
        joules_per_unit: 1.0e4,
        label: "0.01 MJ/m2",
    },
    SolarEpoch {
        resolution: Resolution::Daily,
        start: (1961, 1, 1),
        joules_per_unit: 4.2e4,
        label: "1 cal/cm2",
    },
    SolarEpoch {
        resolution: Resolution::Daily,
        start: (1981, 1, 1),
        joules_per_unit: 1.0e5,
        label: "0.1 MJ/m2",
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Rule {
    Scale(f64),
    WindCode,
    Solar { joules_per_unit: f64, seconds: f64 },
    OffsetPressure,
    Identity,
}

fn unsupported(field: Field, date: NaiveDate, reason: &str) -> ProcessingError {
    ProcessingError::UnsupportedConversion {
        field,
        date,
        reason: reason.to_string(),
    }
}

pub fn solar_epoch(resolution: Resolution, date: NaiveDate) -> Option<&'static SolarEpoch> {
    SOLAR_EPOCHS
        .iter()
        .rev()
        .filter(|epoch| epoch.resolution == resolution)
        .find(|epoch| {
            let (y, m, d) = epoch.start;
            NaiveDate::from_ymd_opt(y, m, d).is_some_and(|start| date >= start)
        })
}

fn rule(field: Field, date: NaiveDate) -> Result<Rule> {
    use Field::*;

    let rule = match field {
        LocalPressure | SeaLevelPressure | Temperature | VaporPressure | DewPoint | WindSpeed
        | SunshineDuration | Precipitation | MeanLocalPressure | MeanSeaLevelPressure
        | MeanTemperature | MaxTemperature | MinTemperature | MeanVaporPressure
        | MeanWindSpeed | MaxWindSpeed | MaxGustSpeed | DailySunshine | Evaporation
        | DailyPrecipitation | MaxHourlyPrecipitation | Max10MinPrecipitation => Rule::Scale(10.0),

        RelativeHumidity | MeanHumidity | MinHumidity => Rule::Scale(100.0),
        // tenths of sky
        CloudCover | MeanCloudCover => Rule::Scale(10.0),

        WindDirection | MaxWindDirection | MaxGustDirection => Rule::WindCode,

        WeatherCode | Snowfall | SnowDepth | DailySnowfall | MaxSnowDepth => Rule::Identity,

        SolarRadiation | DailySolarRadiation => {
            let resolution = field.resolution();
            let epoch = solar_epoch(resolution, date)
                .ok_or_else(|| unsupported(field, date, "no solar radiation unit before 1961"))?;
            let seconds = match resolution {
                Resolution::Hourly => SECONDS_PER_HOUR,
                Resolution::Daily => SECONDS_PER_DAY,
            };
            Rule::Solar {
                joules_per_unit: epoch.joules_per_unit,
                seconds,
            }
        }

        MinSeaLevelPressure => {
            if date.year() <= MIN_SLP_OFFSET_LAST_YEAR {
                Rule::OffsetPressure
            } else {
                Rule::Scale(10.0)
            }
        }

        WindU | WindV => {
            return Err(unsupported(field, date, "derived field has no archive encoding"))
        }
    };
    Ok(rule)
}

/// Convert a raw archive integer to physical units.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use gwo_processor::models::Field;
/// use gwo_processor::utils::units::to_physical;
///
/// let date = NaiveDate::from_ymd_opt(1995, 3, 1).unwrap();
/// assert_eq!(to_physical(Field::Temperature, -25, date).unwrap(), -2.5);
/// ```
pub fn to_physical(field: Field, raw: i64, date: NaiveDate) -> Result<f64> {
    let value = match rule(field, date)? {
        Rule::Scale(scale) => raw as f64 / scale,
        Rule::Identity => raw as f64,
        Rule::Solar {
            joules_per_unit,
            seconds,
        } => raw as f64 * joules_per_unit / seconds,
        Rule::OffsetPressure => {
            let adjusted = if raw >= MIN_SLP_OFFSET {
                raw - MIN_SLP_OFFSET
            } else {
                raw
            };
            adjusted as f64 / 10.0
        }
        Rule::WindCode => {
            let code = u8::try_from(raw).ok().and_then(wind::by_code).ok_or_else(|| {
                ProcessingError::Decode {
                    field,
                    token: raw.to_string(),
                    line: None,
                }
            })?;
            code.degrees
        }
    };
    Ok(value)
}

/// Convert a physical value back to the raw archive integer for `date`.
pub fn to_raw(field: Field, physical: f64, date: NaiveDate) -> Result<i64> {
    let raw = match rule(field, date)? {
        Rule::Scale(scale) => (physical * scale).round() as i64,
        Rule::Identity => physical.round() as i64,
        Rule::Solar {
            joules_per_unit,
            seconds,
        } => (physical * seconds / joules_per_unit).round() as i64,
        Rule::OffsetPressure => {
            let scaled = (physical * 10.0).round() as i64;
            if scaled < MIN_SLP_OFFSET_THRESHOLD {
                scaled + MIN_SLP_OFFSET
            } else {
                scaled
            }
        }
        Rule::WindCode => degrees_to_code(physical) as i64,
    };
    Ok(raw)
}

/// Nearest 16-point sector code for a vector angle; the calm sentinel maps to 0.
pub fn degrees_to_code(degrees: f64) -> u8 {
    if wind::is_calm(degrees) {
        return 0;
    }
    let k = ((-90.0 - degrees) / 22.5).round() as i64;
    match k.rem_euclid(16) {
        0 => 16,
        k => k as u8,
    }
}

/// Convert a web-table value (already a number) to physical units.
pub fn modern_to_physical(field: Field, value: f64, date: NaiveDate) -> Result<f64> {
    use Field::*;

    match field {
        RelativeHumidity => Ok(value / 100.0),
        CloudCover => Ok(value / 10.0),
        // MJ/m2 over the hour
        SolarRadiation => Ok(value * 1.0e6 / SECONDS_PER_HOUR),
        LocalPressure | SeaLevelPressure | Temperature | VaporPressure | DewPoint | WindSpeed
        | SunshineDuration | Precipitation | Snowfall | SnowDepth | WeatherCode => Ok(value),
        WindDirection => Err(unsupported(field, date, "wind direction is given as a label")),
        _ => Err(unsupported(field, date, "not carried by the web tables")),
    }
}

/// Eastward and northward components of a wind vector.
pub fn wind_components(speed: f64, degrees: f64) -> (f64, f64) {
    if wind::is_calm(degrees) {
        return (0.0, 0.0);
    }
    let rad = degrees.to_radians();
    (speed * rad.cos(), speed * rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::wind::CALM_DEGREES;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_scaled_fields() {
        let d = date(2000, 1, 1);
        assert_eq!(to_physical(Field::SeaLevelPressure, 10132, d).unwrap(), 1013.2);
        assert_eq!(to_physical(Field::RelativeHumidity, 65, d).unwrap(), 0.65);
        assert_eq!(to_physical(Field::CloudCover, 8, d).unwrap(), 0.8);
        assert_eq!(to_physical(Field::SnowDepth, 12, d).unwrap(), 12.0);
        assert_eq!(to_raw(Field::Temperature, -2.5, d).unwrap(), -25);
    }

    #[test]
    fn test_min_sea_level_pressure_offset() {
        assert_eq!(to_physical(Field::MinSeaLevelPressure, 10050, date(1995, 1, 1)).unwrap(), 5.0);
        assert_eq!(to_physical(Field::MinSeaLevelPressure, 10050, date(2005, 1, 1)).unwrap(), 1005.0);
        assert_eq!(to_physical(Field::MinSeaLevelPressure, 9985, date(1995, 1, 1)).unwrap(), 998.5);

        let d = date(1995, 1, 1);
        for raw in [5000, 9985, 10050, 14999] {
            let physical = to_physical(Field::MinSeaLevelPressure, raw, d).unwrap();
            assert_eq!(to_raw(Field::MinSeaLevelPressure, physical, d).unwrap(), raw);
        }
        assert_eq!(to_raw(Field::MinSeaLevelPressure, 5.0, date(2005, 1, 1)).unwrap(), 50);
    }

    #[test]
    fn test_solar_epochs() {
        // hourly values are 0.01 MJ/m2 in every era
        for d in [date(1975, 7, 1), date(1995, 7, 1), date(2015, 7, 1)] {
            let hourly = to_physical(Field::SolarRadiation, 36, d).unwrap();
            assert!((hourly - 100.0).abs() < 1e-9, "{d}");
        }

        let daily = to_physical(Field::DailySolarRadiation, 200, date(1990, 7, 1)).unwrap();
        assert!((daily - 200.0 * 1.0e5 / 86_400.0).abs() < 1e-9);
        let daily = to_physical(Field::DailySolarRadiation, 400, date(1980, 7, 1)).unwrap();
        assert!((daily - 400.0 * 4.2e4 / 86_400.0).abs() < 1e-9);
        let daily = to_physical(Field::DailySolarRadiation, 200, date(2015, 7, 1)).unwrap();
        assert!((daily - 200.0 * 1.0e5 / 86_400.0).abs() < 1e-9);

        let err = to_physical(Field::SolarRadiation, 10, date(1960, 12, 31)).unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedConversion { .. }));

        let daily_epoch = |d| solar_epoch(Resolution::Daily, d).unwrap().label;
        assert_eq!(daily_epoch(date(1980, 12, 31)), "1 cal/cm2");
        assert_eq!(daily_epoch(date(1981, 1, 1)), "0.1 MJ/m2");
        assert_eq!(
            solar_epoch(Resolution::Hourly, date(1995, 1, 1)).unwrap().label,
            "0.01 MJ/m2"
        );
    }

    #[test]
    fn test_round_trip_for_defined_rules() {
        let cases = [
            (Field::LocalPressure, 10050, date(1975, 5, 5)),
            (Field::RelativeHumidity, 83, date(1975, 5, 5)),
            (Field::SolarRadiation, 17, date(1975, 5, 5)),
            (Field::SolarRadiation, 17, date(2001, 5, 5)),
            (Field::SolarRadiation, 17, date(2012, 5, 5)),
            (Field::DailySolarRadiation, 1534, date(1999, 5, 5)),
            (Field::DailySolarRadiation, 412, date(1975, 5, 5)),
            (Field::Evaporation, 32, date(1999, 5, 5)),
        ];
        for (field, raw, d) in cases {
            let physical = to_physical(field, raw, d).unwrap();
            assert_eq!(to_raw(field, physical, d).unwrap(), raw, "{field} {d}");
        }
        for code in 0..=16 {
            let d = date(1999, 1, 1);
            let degrees = to_physical(Field::WindDirection, code, d).unwrap();
            assert_eq!(to_raw(Field::WindDirection, degrees, d).unwrap(), code);
        }
    }

    #[test]
    fn test_wind_direction_codes() {
        let d = date(1999, 1, 1);
        assert_eq!(to_physical(Field::WindDirection, 0, d).unwrap(), CALM_DEGREES);
        assert_eq!(to_physical(Field::WindDirection, 16, d).unwrap(), 270.0);
        assert_eq!(to_physical(Field::WindDirection, 8, d).unwrap(), 90.0);
        assert!(to_physical(Field::WindDirection, 17, d).is_err());
        assert_eq!(degrees_to_code(268.0), 16);
        assert_eq!(degrees_to_code(359.0), 12);
    }

    #[test]
    fn test_derived_fields_unsupported() {
        let d = date(2000, 1, 1);
        assert!(matches!(
            to_physical(Field::WindU, 10, d),
            Err(ProcessingError::UnsupportedConversion { .. })
        ));
        assert!(to_raw(Field::WindV, 1.0, d).is_err());
    }

    #[test]
    fn test_modern_units() {
        let d = date(2020, 8, 1);
        assert_eq!(modern_to_physical(Field::RelativeHumidity, 72.0, d).unwrap(), 0.72);
        assert_eq!(modern_to_physical(Field::CloudCover, 10.0, d).unwrap(), 1.0);
        let solar = modern_to_physical(Field::SolarRadiation, 3.6, d).unwrap();
        assert!((solar - 1000.0).abs() < 1e-9);
        assert_eq!(modern_to_physical(Field::Temperature, -1.5, d).unwrap(), -1.5);
        assert!(modern_to_physical(Field::MinSeaLevelPressure, 1000.0, d).is_err());
    }

    #[test]
    fn test_wind_components() {
        let (u, v) = wind_components(5.0, 90.0);
        assert!(u.abs() < 1e-12);
        assert!((v - 5.0).abs() < 1e-12);
        assert_eq!(wind_components(3.0, CALM_DEGREES), (0.0, 0.0));
    }
}
