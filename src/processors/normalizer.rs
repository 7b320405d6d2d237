//! Translation of archive rows and web-table rows into canonical records.
//!
//! Archive rows carry scaled integers, each followed by a one-digit remark
//! code; the remark code decides through the per-family policy whether the
//! integer is read at all. Web rows carry physical values decorated with
//! sentinel symbols, which are mapped onto the same remark-code domain.
//!
//! A malformed station or timestamp aborts with `RowDecode`. A malformed
//! value or remark cell becomes null/MISSING with a warning, or a `Decode`
//! error when the normalizer is strict.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::config::{NormalizerConfig, OffScheduleCloud};
use crate::error::{ProcessingError, Result};
use crate::models::quality::{self, policy};
use crate::models::record::canonical_timestamp;
use crate::models::wind;
use crate::models::{
    CanonicalRecord, Field, NullPolicy, Observation, QualityCode, RawRow,
    SourceFormat, DAILY_FIELDS, HOURLY_FIELDS,
};
use crate::readers::SourceTable;
use crate::utils::constants::{
    CLOUD_OBSERVATION_HOURS, FULLWIDTH_MINUS, LEGACY_DAILY_COLUMNS, LEGACY_HOURLY_COLUMNS,
    SENTINEL_MISSING, SENTINEL_MISSING_CROSS, SENTINEL_NO_PHENOMENON, UNCERTAIN_MARKERS,
};
use crate::utils::units;

/// Value columns of the hourly archive; each remark code sits one column to the right.
pub const LEGACY_HOURLY_LAYOUT: [(Field, usize); 13] = [
    (Field::LocalPressure, 7),
    (Field::SeaLevelPressure, 9),
    (Field::Temperature, 11),
    (Field::VaporPressure, 13),
    (Field::RelativeHumidity, 15),
    (Field::WindDirection, 17),
    (Field::WindSpeed, 19),
    (Field::CloudCover, 21),
    (Field::WeatherCode, 23),
    (Field::DewPoint, 25),
    (Field::SunshineDuration, 27),
    (Field::SolarRadiation, 29),
    (Field::Precipitation, 31),
];

/// Column of the first daily value; daily fields follow in pairs.
pub const LEGACY_DAILY_FIRST_VALUE: usize = 6;

const STATION_COLUMN: usize = 0;
const YEAR_COLUMN: usize = 3;
const MONTH_COLUMN: usize = 4;
const DAY_COLUMN: usize = 5;
const HOUR_COLUMN: usize = 6;

/// Role of a web-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModernColumn {
    Station,
    Year,
    Month,
    Day,
    Hour,
    /// Combined `YYYY/MM/DD HH:MM[:SS]` stamp.
    DateTime,
    Value(Field),
}

const MODERN_LABELS: [(&str, ModernColumn); 23] = [
    ("観測所ID", ModernColumn::Station),
    ("年", ModernColumn::Year),
    ("月", ModernColumn::Month),
    ("日", ModernColumn::Day),
    ("時", ModernColumn::Hour),
    ("時刻", ModernColumn::Hour),
    ("年月日時", ModernColumn::DateTime),
    ("現地気圧", ModernColumn::Value(Field::LocalPressure)),
    ("海面気圧", ModernColumn::Value(Field::SeaLevelPressure)),
    ("降水量", ModernColumn::Value(Field::Precipitation)),
    ("気温", ModernColumn::Value(Field::Temperature)),
    ("露点温度", ModernColumn::Value(Field::DewPoint)),
    ("蒸気圧", ModernColumn::Value(Field::VaporPressure)),
    ("湿度", ModernColumn::Value(Field::RelativeHumidity)),
    ("相対湿度", ModernColumn::Value(Field::RelativeHumidity)),
    ("風速", ModernColumn::Value(Field::WindSpeed)),
    ("風向", ModernColumn::Value(Field::WindDirection)),
    ("日照時間", ModernColumn::Value(Field::SunshineDuration)),
    ("全天日射量", ModernColumn::Value(Field::SolarRadiation)),
    ("降雪", ModernColumn::Value(Field::Snowfall)),
    ("積雪", ModernColumn::Value(Field::SnowDepth)),
    ("天気", ModernColumn::Value(Field::WeatherCode)),
    ("雲量", ModernColumn::Value(Field::CloudCover)),
];

/// Column positions of a web table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModernLayout {
    columns: Vec<(usize, ModernColumn)>,
}

impl ModernLayout {
    /// Column order of the hourly web table when no header is available.
    pub fn positional() -> Self {
        let values = [
            Field::LocalPressure,
            Field::SeaLevelPressure,
            Field::Precipitation,
            Field::Temperature,
            Field::DewPoint,
            Field::VaporPressure,
            Field::RelativeHumidity,
            Field::WindSpeed,
            Field::WindDirection,
            Field::SunshineDuration,
            Field::SolarRadiation,
            Field::Snowfall,
            Field::SnowDepth,
            Field::WeatherCode,
            Field::CloudCover,
        ];
        // column 16 is visibility
        let mut columns = vec![(0, ModernColumn::Hour)];
        columns.extend(
            values
                .iter()
                .enumerate()
                .map(|(i, field)| (i + 1, ModernColumn::Value(*field))),
        );
        columns.extend([
            (17, ModernColumn::Year),
            (18, ModernColumn::Month),
            (19, ModernColumn::Day),
        ]);
        Self { columns }
    }

    /// Map header labels onto column roles. Units in brackets are ignored.
    pub fn from_header(header: &[String]) -> Result<Self> {
        let mut columns = Vec::new();
        for (index, label) in header.iter().enumerate() {
            let key = strip_unit(label);
            match MODERN_LABELS.iter().find(|(name, _)| *name == key) {
                Some((_, role)) if !columns.iter().any(|(_, r)| r == role) => {
                    columns.push((index, *role))
                }
                Some(_) => debug!("Ignoring repeated web table column '{}'", label),
                None => debug!("Ignoring web table column '{}'", label),
            }
        }

        let layout = Self { columns };
        let has_date_parts = [
            ModernColumn::Year,
            ModernColumn::Month,
            ModernColumn::Day,
            ModernColumn::Hour,
        ]
        .iter()
        .all(|role| layout.column(*role).is_some());
        if !has_date_parts && layout.column(ModernColumn::DateTime).is_none() {
            return Err(ProcessingError::InvalidFormat(
                "web table header has no 年/月/日/時 or 年月日時 columns".to_string(),
            ));
        }
        Ok(layout)
    }

    pub fn column(&self, role: ModernColumn) -> Option<usize> {
        self.columns
            .iter()
            .find(|(_, r)| *r == role)
            .map(|(index, _)| *index)
    }
}

fn strip_unit(label: &str) -> &str {
    let label = label.trim();
    label
        .find(['(', '（'])
        .map(|pos| label[..pos].trim_end())
        .unwrap_or(label)
}

pub struct Normalizer {
    config: NormalizerConfig,
    modern_layout: ModernLayout,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            modern_layout: ModernLayout::positional(),
        }
    }

    /// Use the column labels of a web table instead of the positional layout.
    pub fn with_modern_header(mut self, header: &[String]) -> Result<Self> {
        self.modern_layout = ModernLayout::from_header(header)?;
        Ok(self)
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one row. The record carries every field of the format.
    pub fn normalize(&self, row: &RawRow, format: SourceFormat) -> Result<CanonicalRecord> {
        match format {
            SourceFormat::LegacyArchive => self.normalize_legacy_hourly(row),
            SourceFormat::LegacyDailyArchive => self.normalize_legacy_daily(row),
            SourceFormat::ModernWeb => self.normalize_modern(row),
        }
    }

    /// Normalize rows in order; the first row-level failure aborts.
    pub fn normalize_rows(
        &self,
        rows: &[RawRow],
        format: SourceFormat,
    ) -> Result<Vec<CanonicalRecord>> {
        let records = rows
            .iter()
            .map(|row| self.normalize(row, format))
            .collect::<Result<Vec<_>>>()?;
        debug!("Normalized {} {:?} rows", records.len(), format);
        Ok(records)
    }

    /// Normalize a whole table, honouring its header when it has one.
    pub fn normalize_table(&self, table: &SourceTable) -> Result<Vec<CanonicalRecord>> {
        match (&table.header, table.format) {
            (Some(header), SourceFormat::ModernWeb) => {
                let normalizer = Normalizer::new(self.config.clone()).with_modern_header(header)?;
                normalizer.normalize_rows(&table.rows, table.format)
            }
            _ => self.normalize_rows(&table.rows, table.format),
        }
    }

    fn normalize_legacy_hourly(&self, row: &RawRow) -> Result<CanonicalRecord> {
        require_columns(row, LEGACY_HOURLY_COLUMNS)?;
        let station_id = legacy_station(row)?;
        let date = parse_date(row, YEAR_COLUMN, MONTH_COLUMN, DAY_COLUMN)?;
        let hour = parse_hour(row, HOUR_COLUMN)?;
        let timestamp = labelled_timestamp(row, date, hour)?;

        let mut record = CanonicalRecord::synthesized(station_id, timestamp, &HOURLY_FIELDS);
        for (field, value_column) in LEGACY_HOURLY_LAYOUT {
            let observation = self.recover(
                row,
                field,
                decode_legacy_cell(
                    field,
                    cell(row, value_column),
                    cell(row, value_column + 1),
                    date,
                ),
            )?;
            record.set(field, observation);
        }
        derive_wind_components(&mut record);
        Ok(record)
    }

    fn normalize_legacy_daily(&self, row: &RawRow) -> Result<CanonicalRecord> {
        require_columns(row, LEGACY_DAILY_COLUMNS)?;
        let station_id = legacy_station(row)?;
        let date = parse_date(row, YEAR_COLUMN, MONTH_COLUMN, DAY_COLUMN)?;
        let timestamp = labelled_timestamp(row, date, 0)?;

        let mut record = CanonicalRecord::new(station_id, timestamp);
        for (i, field) in DAILY_FIELDS.iter().enumerate() {
            let value_column = LEGACY_DAILY_FIRST_VALUE + 2 * i;
            let observation = self.recover(
                row,
                *field,
                decode_legacy_cell(
                    *field,
                    cell(row, value_column),
                    cell(row, value_column + 1),
                    date,
                ),
            )?;
            record.set(*field, observation);
        }
        Ok(record)
    }

    fn normalize_modern(&self, row: &RawRow) -> Result<CanonicalRecord> {
        let layout = &self.modern_layout;

        let station_id = match (row.station_id, layout.column(ModernColumn::Station)) {
            (Some(id), _) => id,
            (None, Some(column)) => parse_station(row, column)?,
            (None, None) => {
                return Err(row_error(row, "web row has no station id".to_string()));
            }
        };

        let (date, hour) = match layout.column(ModernColumn::DateTime) {
            Some(column) => parse_web_datetime(row, column)?,
            None => {
                let year = layout.column(ModernColumn::Year);
                let month = layout.column(ModernColumn::Month);
                let day = layout.column(ModernColumn::Day);
                let hour = layout.column(ModernColumn::Hour);
                match (year, month, day, hour) {
                    (Some(y), Some(m), Some(d), Some(h)) => {
                        (parse_date(row, y, m, d)?, parse_hour(row, h)?)
                    }
                    _ => return Err(row_error(row, "web row has no timestamp".to_string())),
                }
            }
        };
        let timestamp = labelled_timestamp(row, date, hour)?;

        let mut record = CanonicalRecord::synthesized(station_id, timestamp, &HOURLY_FIELDS);
        for field in HOURLY_FIELDS.iter().filter(|f| !f.is_derived()) {
            let Some(column) = layout.column(ModernColumn::Value(*field)) else {
                continue;
            };
            let token = cell(row, column);
            let observation = if *field == Field::CloudCover && !is_cloud_hour(hour) {
                self.off_schedule_cloud(token, date)
            } else {
                self.recover(row, *field, decode_modern_cell(*field, token, date))?
            };
            record.set(*field, observation);
        }
        derive_wind_components(&mut record);
        Ok(record)
    }

    /// A cloud cell at an hour with no scheduled observation. A genuine value
    /// is kept; anything else is tagged per configuration.
    fn off_schedule_cloud(&self, token: &str, date: NaiveDate) -> Observation {
        match decode_modern_cell(Field::CloudCover, token, date) {
            Ok(observation) if observation.value.is_some() => observation,
            _ => match self.config.off_schedule_cloud {
                OffScheduleCloud::NotObserved => Observation::null(QualityCode::NotObserved),
                OffScheduleCloud::Missing => Observation::null(QualityCode::Missing),
            },
        }
    }

    /// Turn a cell-level failure into null/MISSING unless strict.
    fn recover(
        &self,
        row: &RawRow,
        field: Field,
        result: Result<Observation>,
    ) -> Result<Observation> {
        match result {
            Ok(observation) => Ok(observation),
            Err(e) if self.config.strict => Err(e.at_line(row.line)),
            Err(e) => {
                warn!("Line {}: {} recorded as missing: {}", row.line, field, e);
                Ok(Observation::null(QualityCode::Missing))
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

fn cell(row: &RawRow, index: usize) -> &str {
    row.cell(index).unwrap_or("")
}

fn row_error(row: &RawRow, message: String) -> ProcessingError {
    ProcessingError::RowDecode {
        line: row.line,
        message,
    }
}

fn require_columns(row: &RawRow, expected: usize) -> Result<()> {
    if row.cells.len() < expected {
        return Err(row_error(
            row,
            format!("expected {} columns, found {}", expected, row.cells.len()),
        ));
    }
    Ok(())
}

fn parse_station(row: &RawRow, column: usize) -> Result<u32> {
    let token = cell(row, column);
    token
        .trim()
        .parse::<u32>()
        .map_err(|_| row_error(row, format!("invalid station id '{}'", token)))
}

fn legacy_station(row: &RawRow) -> Result<u32> {
    match row.station_id {
        Some(id) => Ok(id),
        None => parse_station(row, STATION_COLUMN),
    }
}

fn parse_number<T: std::str::FromStr>(row: &RawRow, column: usize, what: &str) -> Result<T> {
    let token = cell(row, column);
    token
        .trim()
        .parse::<T>()
        .map_err(|_| row_error(row, format!("invalid {} '{}'", what, token)))
}

fn parse_date(row: &RawRow, year: usize, month: usize, day: usize) -> Result<NaiveDate> {
    let y: i32 = parse_number(row, year, "year")?;
    let m: u32 = parse_number(row, month, "month")?;
    let d: u32 = parse_number(row, day, "day")?;
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| row_error(row, format!("invalid date {}-{}-{}", y, m, d)))
}

fn parse_hour(row: &RawRow, column: usize) -> Result<u32> {
    let hour: u32 = parse_number(row, column, "hour")?;
    if hour > 24 {
        return Err(row_error(row, format!("hour {} outside 0-24", hour)));
    }
    Ok(hour)
}

fn parse_web_datetime(row: &RawRow, column: usize) -> Result<(NaiveDate, u32)> {
    let token = cell(row, column).trim();
    let timestamp = ["%Y/%m/%d %H:%M:%S", "%Y/%m/%d %H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(token, format).ok())
        .ok_or_else(|| row_error(row, format!("invalid timestamp '{}'", token)))?;

    // Midnight stamps belong to hour 24 of the previous day.
    if timestamp.hour() == 0 {
        let previous = timestamp
            .date()
            .pred_opt()
            .ok_or_else(|| row_error(row, format!("timestamp out of range '{}'", token)))?;
        Ok((previous, 24))
    } else {
        Ok((timestamp.date(), timestamp.hour()))
    }
}

fn labelled_timestamp(row: &RawRow, date: NaiveDate, hour: u32) -> Result<NaiveDateTime> {
    canonical_timestamp(date, hour)
        .ok_or_else(|| row_error(row, format!("timestamp out of range {} {}h", date, hour)))
}

fn is_cloud_hour(hour: u32) -> bool {
    hour == 0 || CLOUD_OBSERVATION_HOURS.contains(&hour)
}

fn decode_error(field: Field, token: &str) -> ProcessingError {
    ProcessingError::Decode {
        field,
        token: token.to_string(),
        line: None,
    }
}

/// Decode one archive (value, remark) pair. The value cell is only read when
/// the remark code says the stored value stands.
pub fn decode_legacy_cell(
    field: Field,
    value_token: &str,
    remark_token: &str,
    date: NaiveDate,
) -> Result<Observation> {
    let code = quality::classify(field, remark_token)?;
    let observation = match policy(field.family(), code) {
        NullPolicy::Null => Observation::null(code),
        NullPolicy::Zero => Observation::observed(0.0, code),
        NullPolicy::Literal => {
            let raw = value_token
                .trim()
                .parse::<i64>()
                .map_err(|_| decode_error(field, value_token))?;
            Observation::observed(units::to_physical(field, raw, date)?, code)
        }
    };
    Ok(observation)
}

/// Decode one web-table cell.
pub fn decode_modern_cell(field: Field, token: &str, date: NaiveDate) -> Result<Observation> {
    let token = token.trim();
    let family = field.family();

    if token.is_empty() {
        let code = QualityCode::NotObserved;
        return Ok(Observation::new(quality::resolve(field, code, None), code));
    }
    if token == SENTINEL_NO_PHENOMENON {
        return Ok(if family.is_accumulative() {
            Observation::observed(0.0, QualityCode::NoPhenomenon)
        } else {
            Observation::null(QualityCode::NotObserved)
        });
    }
    if token == SENTINEL_MISSING || token == SENTINEL_MISSING_CROSS {
        return Ok(Observation::null(QualityCode::Missing));
    }

    let (cleaned, code) = strip_uncertainty(token);

    let value = match field {
        Field::WindDirection => {
            wind::by_label(&cleaned)
                .ok_or_else(|| decode_error(field, token))?
                .degrees
        }
        Field::CloudCover => {
            let digits: String = cleaned
                .chars()
                .filter(|c| !matches!(c, '+' | '-') && *c != FULLWIDTH_MINUS)
                .collect();
            let tenths = digits
                .trim()
                .parse::<f64>()
                .map_err(|_| decode_error(field, token))?;
            if !(0.0..=10.0).contains(&tenths) {
                return Ok(Observation::null(QualityCode::Missing));
            }
            units::modern_to_physical(field, tenths, date)?
        }
        _ => {
            let number = cleaned
                .replace(FULLWIDTH_MINUS, "-")
                .trim()
                .parse::<f64>()
                .map_err(|_| decode_error(field, token))?;
            units::modern_to_physical(field, number, date)?
        }
    };

    Ok(Observation::new(quality::resolve(field, code, Some(value)), code))
}

/// Remove uncertainty markers; their presence makes the value ESTIMATED.
fn strip_uncertainty(token: &str) -> (String, QualityCode) {
    if token.contains(UNCERTAIN_MARKERS) {
        let cleaned: String = token.chars().filter(|c| !UNCERTAIN_MARKERS.contains(c)).collect();
        (cleaned.trim().to_string(), QualityCode::Estimated)
    } else {
        (token.to_string(), QualityCode::Normal)
    }
}

/// Fill `wind_u`/`wind_v` from speed and direction. The quality is the lower
/// of the two inputs; a null input passes its code on.
pub fn derive_wind_components(record: &mut CanonicalRecord) {
    let speed = record
        .get(Field::WindSpeed)
        .unwrap_or_else(Observation::not_created);
    let direction = record
        .get(Field::WindDirection)
        .unwrap_or_else(Observation::not_created);

    let (u, v) = match (speed.value, direction.value) {
        (Some(s), Some(d)) => {
            let (u, v) = units::wind_components(s, d);
            let code = speed.quality.min(direction.quality);
            (Observation::observed(u, code), Observation::observed(v, code))
        }
        (None, Some(_)) => (
            Observation::null(speed.quality),
            Observation::null(speed.quality),
        ),
        (Some(_), None) => (
            Observation::null(direction.quality),
            Observation::null(direction.quality),
        ),
        (None, None) => {
            let code = speed.quality.min(direction.quality);
            (Observation::null(code), Observation::null(code))
        }
    };
    record.set(Field::WindU, u);
    record.set(Field::WindV, v);
}

/// Labelled (date, 1-24 hour) of a canonical hourly timestamp.
pub fn labelled_date_hour(timestamp: NaiveDateTime) -> (NaiveDate, u32) {
    match timestamp.hour() {
        0 => (
            timestamp.date().pred_opt().unwrap_or(timestamp.date()),
            24,
        ),
        hour => (timestamp.date(), hour),
    }
}
