//! Gap filling and hourly densification of a station series.
//!
//! The gap-filled series keeps every input record and adds null/NOT_CREATED
//! records for grid points the archive never produced: 3-hourly before the
//! configured cutover, hourly from it. The hourly series then has exactly one
//! record per hour over the requested range; continuous and discrete fields
//! are filled between original values no further apart than the configured
//! gap, accumulative fields never are.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DiscreteFill, ResampleConfig};
use crate::error::{ProcessingError, Result};
use crate::models::wind;
use crate::models::{
    CanonicalRecord, Field, FieldFamily, Observation, QualityCode, Resolution, StationSeries,
    HOURLY_FIELDS,
};
use crate::utils::constants::LEGACY_INTERVAL_HOURS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResampleStats {
    pub input_records: usize,
    pub synthesized_records: usize,
    pub hourly_records: usize,
    pub interpolated_values: usize,
}

#[derive(Debug, Clone)]
pub struct ResampleOutput {
    pub gap_filled: StationSeries,
    pub hourly: StationSeries,
    pub stats: ResampleStats,
}

pub struct Resampler {
    config: ResampleConfig,
}

impl Resampler {
    pub fn new(config: ResampleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    /// Validate raw records into a series, then resample it.
    pub fn resample_records(
        &self,
        station_id: u32,
        records: Vec<CanonicalRecord>,
    ) -> Result<ResampleOutput> {
        let series = StationSeries::from_records(station_id, records)?;
        self.resample(&series)
    }

    pub fn resample(&self, series: &StationSeries) -> Result<ResampleOutput> {
        if series.resolution() == Some(Resolution::Daily) {
            return Err(ProcessingError::InvalidFormat(format!(
                "station {}: daily series cannot be resampled to hourly",
                series.station_id()
            )));
        }

        let gap_filled = self.gap_fill(series)?;
        let (hourly, interpolated_values) = self.densify(&gap_filled)?;

        let stats = ResampleStats {
            input_records: series.len(),
            synthesized_records: gap_filled.len() - series.len(),
            hourly_records: hourly.len(),
            interpolated_values,
        };
        info!(
            "Station {}: {} records, {} synthesized, {} hourly, {} values interpolated",
            series.station_id(),
            stats.input_records,
            stats.synthesized_records,
            stats.hourly_records,
            stats.interpolated_values
        );

        Ok(ResampleOutput {
            gap_filled,
            hourly,
            stats,
        })
    }

    /// Insert null/NOT_CREATED records at missing native grid points.
    pub fn gap_fill(&self, series: &StationSeries) -> Result<StationSeries> {
        let station_id = series.station_id();
        let (Some(first), Some(end)) = (series.first_timestamp(), series.last_timestamp()) else {
            return Ok(series.clone());
        };
        let start = series
            .observation_start()
            .map_or(first, |obs_start| obs_start.min(first));

        let cutover = self.config.hourly_cutover_timestamp();
        let on_grid = |t: NaiveDateTime| {
            t >= cutover || i64::from(t.hour()) % LEGACY_INTERVAL_HOURS == 0
        };

        let mut records = Vec::with_capacity(series.len());
        let mut inputs = series.records().iter().peekable();
        let mut t = start;
        while t <= end {
            while let Some(record) = inputs.next_if(|r| r.timestamp < t) {
                records.push(record.clone());
            }
            if let Some(record) = inputs.next_if(|r| r.timestamp == t) {
                records.push(record.clone());
            } else if on_grid(t) {
                records.push(CanonicalRecord::synthesized(station_id, t, &HOURLY_FIELDS));
            }
            t += Duration::hours(1);
        }
        records.extend(inputs.cloned());

        debug!(
            "Station {}: gap filling {} -> {} records",
            station_id,
            series.len(),
            records.len()
        );

        let mut gap_filled = StationSeries::from_records(station_id, records)?;
        if let Some(obs_start) = series.observation_start() {
            gap_filled = gap_filled.with_observation_start(obs_start.date());
        }
        Ok(gap_filled)
    }

    /// Fill `fields` between the series' own records, without adding records
    /// or retagging the nulls left over. Returns the series and the number of
    /// values filled.
    pub fn fill_fields(
        &self,
        series: &StationSeries,
        fields: &[Field],
    ) -> Result<(StationSeries, usize)> {
        let mut records = series.records().to_vec();
        let filled: usize = fields
            .iter()
            .map(|&field| self.fill_field(&mut records, field))
            .sum();
        debug!("Station {}: {} values filled in place", series.station_id(), filled);

        let mut output = StationSeries::from_records(series.station_id(), records)?;
        if let Some(obs_start) = series.observation_start() {
            output = output.with_observation_start(obs_start.date());
        }
        Ok((output, filled))
    }

    /// One record per hour over the requested range, with fillable nulls filled.
    fn densify(&self, gap_filled: &StationSeries) -> Result<(StationSeries, usize)> {
        let station_id = gap_filled.station_id();
        let requested_start = self.config.range_start.or(gap_filled.first_timestamp());
        let requested_end = self.config.range_end.or(gap_filled.last_timestamp());
        let (Some(requested_start), Some(requested_end)) = (requested_start, requested_end) else {
            return Ok((StationSeries::from_records(station_id, Vec::new())?, 0));
        };

        // Fill over the union of the requested and observed spans so that
        // brackets just outside the requested range still count.
        let start = gap_filled
            .first_timestamp()
            .map_or(requested_start, |t| t.min(requested_start));
        let end = gap_filled
            .last_timestamp()
            .map_or(requested_end, |t| t.max(requested_end));

        let mut grid = Vec::new();
        let mut sources = gap_filled.records().iter().peekable();
        let mut t = start;
        while t <= end {
            while sources.next_if(|r| r.timestamp < t).is_some() {}
            let record = match sources.next_if(|r| r.timestamp == t) {
                Some(record) => record.clone(),
                None => CanonicalRecord::synthesized(station_id, t, &HOURLY_FIELDS),
            };
            grid.push(record);
            t += Duration::hours(1);
        }

        let mut interpolated = 0;
        for field in HOURLY_FIELDS {
            interpolated += self.fill_field(&mut grid, field);
        }

        let hourly: Vec<CanonicalRecord> = grid
            .into_iter()
            .filter(|r| r.timestamp >= requested_start && r.timestamp <= requested_end)
            .map(finalize_nulls)
            .collect();

        Ok((StationSeries::from_records(station_id, hourly)?, interpolated))
    }

    /// Fill one field across time-ordered records; returns the number of values filled.
    fn fill_field(&self, grid: &mut [CanonicalRecord], field: Field) -> usize {
        let family = field.family();
        if family.is_accumulative() {
            return 0;
        }

        let originals: Vec<Option<f64>> = grid
            .iter()
            .map(|r| r.get(field).filter(|o| o.is_original_value()).and_then(|o| o.value))
            .collect();

        let mut previous = vec![None; grid.len()];
        let mut last = None;
        for (i, value) in originals.iter().enumerate() {
            previous[i] = last;
            if value.is_some() {
                last = Some(i);
            }
        }
        let mut next = vec![None; grid.len()];
        let mut last = None;
        for (i, value) in originals.iter().enumerate().rev() {
            next[i] = last;
            if value.is_some() {
                last = Some(i);
            }
        }

        let max_gap = i64::from(self.config.max_interpolation_gap_hours);
        let mut filled = 0;
        for i in 0..grid.len() {
            let observation = grid[i].get(field).unwrap_or_else(Observation::not_created);
            if !observation.is_null() || !observation.quality.is_fillable() {
                continue;
            }
            let (Some(p), Some(n)) = (previous[i], next[i]) else {
                continue;
            };
            let span = grid[n].timestamp - grid[p].timestamp;
            if span.num_hours() > max_gap {
                continue;
            }
            let (Some(before), Some(after)) = (originals[p], originals[n]) else {
                continue;
            };

            let elapsed = grid[i].timestamp - grid[p].timestamp;
            let fraction = elapsed.num_seconds() as f64 / span.num_seconds() as f64;
            let value = match (family, field) {
                (_, Field::WindDirection) => interpolate_direction(before, after, fraction),
                (FieldFamily::Discrete, _) => match self.config.discrete_fill {
                    DiscreteFill::HoldForward => before,
                    DiscreteFill::Linear => lerp(before, after, fraction),
                },
                _ => lerp(before, after, fraction),
            };
            grid[i].set(field, Observation::observed(value, QualityCode::Interpolated));
            filled += 1;
        }
        filled
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(ResampleConfig::default())
    }
}

fn lerp(before: f64, after: f64, fraction: f64) -> f64 {
    before + (after - before) * fraction
}

/// Interpolate along the shorter arc; a calm endpoint holds the earlier value.
fn interpolate_direction(before: f64, after: f64, fraction: f64) -> f64 {
    if wind::is_calm(before) || wind::is_calm(after) {
        return before;
    }
    let diff = (after - before + 540.0).rem_euclid(360.0) - 180.0;
    (before + diff * fraction).rem_euclid(360.0)
}

/// Nulls left in terminal output are NOT_CREATED unless known MISSING.
fn finalize_nulls(mut record: CanonicalRecord) -> CanonicalRecord {
    let stale: Vec<Field> = record
        .observations()
        .filter(|(_, o)| o.is_null() && o.quality != QualityCode::Missing)
        .map(|(f, _)| f)
        .collect();
    for field in stale {
        record.set(field, Observation::not_created());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegrityViolation;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn hourly_record(t: NaiveDateTime) -> CanonicalRecord {
        let mut record = CanonicalRecord::synthesized(662, t, &HOURLY_FIELDS);
        record.set(Field::Temperature, Observation::observed(10.0 + t.hour() as f64, QualityCode::Normal));
        record.set(Field::Precipitation, Observation::observed(0.0, QualityCode::NoPhenomenon));
        record
    }

    fn with_cloud(mut record: CanonicalRecord, cloud: Option<f64>) -> CanonicalRecord {
        let observation = match cloud {
            Some(v) => Observation::observed(v, QualityCode::Normal),
            None => Observation::null(QualityCode::NotObserved),
        };
        record.set(Field::CloudCover, observation);
        record
    }

    /// Hourly-era rows 03:00-06:00 with cloud only at 03:00 and 06:00.
    fn cloud_series() -> StationSeries {
        let records = vec![
            with_cloud(hourly_record(ts(1995, 6, 1, 3)), Some(0.8)),
            with_cloud(hourly_record(ts(1995, 6, 1, 4)), None),
            with_cloud(hourly_record(ts(1995, 6, 1, 5)), None),
            with_cloud(hourly_record(ts(1995, 6, 1, 6)), Some(0.2)),
        ];
        StationSeries::from_records(662, records).unwrap()
    }

    #[test]
    fn test_cloud_hold_forward() {
        let output = Resampler::default().resample(&cloud_series()).unwrap();
        let hourly = output.hourly.records();

        assert_eq!(hourly.len(), 4);
        assert_eq!(hourly[0].get(Field::CloudCover), Some(Observation::observed(0.8, QualityCode::Normal)));
        assert_eq!(hourly[1].get(Field::CloudCover), Some(Observation::observed(0.8, QualityCode::Interpolated)));
        assert_eq!(hourly[2].get(Field::CloudCover), Some(Observation::observed(0.8, QualityCode::Interpolated)));
        assert_eq!(hourly[3].get(Field::CloudCover), Some(Observation::observed(0.2, QualityCode::Normal)));
        assert_eq!(output.stats.interpolated_values, 2);
    }

    #[test]
    fn test_cloud_linear() {
        let config = ResampleConfig::default().with_discrete_fill(DiscreteFill::Linear);
        let output = Resampler::new(config).resample(&cloud_series()).unwrap();
        let hourly = output.hourly.records();

        let at_4 = hourly[1].get(Field::CloudCover).unwrap();
        let at_5 = hourly[2].get(Field::CloudCover).unwrap();
        assert_eq!(at_4.quality, QualityCode::Interpolated);
        assert!((at_4.value.unwrap() - 0.6).abs() < 1e-9);
        assert!((at_5.value.unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(hourly[0].value(Field::CloudCover), Some(0.8));
        assert_eq!(hourly[3].value(Field::CloudCover), Some(0.2));
    }

    #[test]
    fn test_legacy_gap_is_synthesized_and_interpolated() {
        // 3-hourly era, 06:00 row missing between 03:00 and 09:00
        let records = vec![hourly_record(ts(1980, 1, 1, 3)), hourly_record(ts(1980, 1, 1, 9))];
        let config = ResampleConfig::default().with_max_gap_hours(6);
        let output = Resampler::new(config).resample_records(662, records).unwrap();

        let gap_filled = output.gap_filled.records();
        assert_eq!(gap_filled.len(), 3);
        assert_eq!(gap_filled[1].timestamp, ts(1980, 1, 1, 6));
        for (_, observation) in gap_filled[1].observations() {
            assert_eq!(observation, Observation::not_created());
        }
        assert_eq!(output.stats.synthesized_records, 1);

        let hourly = output.hourly.records();
        assert_eq!(hourly.len(), 7);
        let at_6 = hourly[3].get(Field::Temperature).unwrap();
        assert_eq!(at_6.quality, QualityCode::Interpolated);
        assert!((at_6.value.unwrap() - 16.0).abs() < 1e-9);
        // accumulative fields stay empty
        assert_eq!(hourly[3].get(Field::Precipitation), Some(Observation::not_created()));
    }

    #[test]
    fn test_default_gap_limit_leaves_long_gaps_empty() {
        let records = vec![hourly_record(ts(1980, 1, 1, 3)), hourly_record(ts(1980, 1, 1, 9))];
        let output = Resampler::default().resample_records(662, records).unwrap();
        let at_6 = output.hourly.records()[3].get(Field::Temperature).unwrap();
        assert_eq!(at_6, Observation::not_created());
    }

    #[test]
    fn test_one_record_per_hour_over_requested_range() {
        let records = vec![hourly_record(ts(1990, 12, 31, 21)), hourly_record(ts(1991, 1, 1, 2))];
        let config = ResampleConfig::default()
            .with_range(Some(ts(1990, 12, 31, 18)), Some(ts(1991, 1, 1, 5)));
        let output = Resampler::new(config).resample_records(662, records).unwrap();

        // 3-hourly grid before the cutover, hourly after
        let gap_times: Vec<u32> = output.gap_filled.records().iter().map(|r| r.timestamp.hour()).collect();
        assert_eq!(gap_times, vec![21, 0, 1, 2]);

        let hourly = output.hourly.records();
        assert_eq!(hourly.len(), 12);
        for (i, record) in hourly.iter().enumerate() {
            assert_eq!(record.timestamp, ts(1990, 12, 31, 18) + Duration::hours(i as i64));
            assert!(record.has_valid_nulls());
        }
    }

    #[test]
    fn test_hour_24_has_no_duplicate_midnight() {
        let midnight = crate::models::canonical_timestamp(NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(), 24).unwrap();
        let records = vec![
            hourly_record(ts(2020, 12, 31, 23)),
            hourly_record(midnight),
            hourly_record(ts(2021, 1, 1, 1)),
        ];
        let output = Resampler::default().resample_records(662, records).unwrap();
        let stamps: Vec<NaiveDateTime> = output.hourly.records().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![ts(2020, 12, 31, 23), ts(2021, 1, 1, 0), ts(2021, 1, 1, 1)]);
        assert!(!stamps.contains(&ts(2020, 12, 31, 0)));
    }

    #[test]
    fn test_observation_start_extends_grid() {
        let series = StationSeries::from_records(662, vec![hourly_record(ts(1975, 3, 1, 6))])
            .unwrap()
            .with_observation_start(NaiveDate::from_ymd_opt(1975, 3, 1).unwrap());
        let gap_filled = Resampler::default().gap_fill(&series).unwrap();
        let times: Vec<u32> = gap_filled.records().iter().map(|r| r.timestamp.hour()).collect();
        assert_eq!(times, vec![0, 3, 6]);
    }

    #[test]
    fn test_terminal_nulls_are_not_created_or_missing() {
        let mut record = hourly_record(ts(2000, 1, 1, 1));
        record.set(Field::Temperature, Observation::null(QualityCode::Missing));
        record.set(Field::CloudCover, Observation::null(QualityCode::NotObserved));
        let output = Resampler::default().resample_records(662, vec![record]).unwrap();
        let hourly = &output.hourly.records()[0];

        assert_eq!(hourly.get(Field::Temperature), Some(Observation::null(QualityCode::Missing)));
        assert_eq!(hourly.get(Field::CloudCover), Some(Observation::not_created()));
        // the gap-filled series keeps the normalizer's tag
        assert_eq!(
            output.gap_filled.records()[0].quality(Field::CloudCover),
            Some(QualityCode::NotObserved)
        );
    }

    #[test]
    fn test_interpolated_values_are_not_brackets() {
        // a previously interpolated value must not extend a bracket
        let mut middle = hourly_record(ts(2000, 1, 1, 2));
        middle.set(Field::Temperature, Observation::observed(50.0, QualityCode::Interpolated));
        let mut gap = hourly_record(ts(2000, 1, 1, 3));
        gap.set(Field::Temperature, Observation::null(QualityCode::Missing));
        let records = vec![hourly_record(ts(2000, 1, 1, 1)), middle, gap, hourly_record(ts(2000, 1, 1, 4))];

        let output = Resampler::default().resample_records(662, records).unwrap();
        let at_3 = output.hourly.records()[2].get(Field::Temperature).unwrap();
        assert!((at_3.value.unwrap() - 13.0).abs() < 1e-9);
        assert_eq!(output.hourly.records()[1].value(Field::Temperature), Some(50.0));
    }

    #[test]
    fn test_wind_direction_shorter_arc_and_calm() {
        let mut a = hourly_record(ts(2000, 1, 1, 1));
        a.set(Field::WindDirection, Observation::observed(350.0, QualityCode::Normal));
        let mut b = hourly_record(ts(2000, 1, 1, 2));
        b.set(Field::WindDirection, Observation::null(QualityCode::Missing));
        let mut c = hourly_record(ts(2000, 1, 1, 3));
        c.set(Field::WindDirection, Observation::observed(30.0, QualityCode::Normal));

        let output = Resampler::default().resample_records(662, vec![a, b, c]).unwrap();
        let mid = output.hourly.records()[1].value(Field::WindDirection).unwrap();
        assert!((mid - 10.0).abs() < 1e-9);

        assert_eq!(interpolate_direction(wind::CALM_DEGREES, 90.0, 0.5), wind::CALM_DEGREES);
        assert_eq!(interpolate_direction(90.0, wind::CALM_DEGREES, 0.5), 90.0);
    }

    #[test]
    fn test_integrity_errors() {
        let records = vec![hourly_record(ts(2000, 1, 1, 3)), hourly_record(ts(2000, 1, 1, 3))];
        let err = Resampler::default().resample_records(662, records).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::SeriesIntegrity { violation: IntegrityViolation::Duplicate, .. }
        ));

        let records = vec![hourly_record(ts(2000, 1, 1, 4)), hourly_record(ts(2000, 1, 1, 3))];
        let err = Resampler::default().resample_records(662, records).unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::SeriesIntegrity { violation: IntegrityViolation::OutOfOrder, .. }
        ));
    }

    #[test]
    fn test_daily_series_rejected() {
        let mut record = CanonicalRecord::new(662, ts(2000, 1, 1, 0));
        record.set(Field::MeanTemperature, Observation::observed(5.0, QualityCode::Normal));
        let err = Resampler::default().resample_records(662, vec![record]).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidFormat(_)));
    }

    #[test]
    fn test_fill_fields_keeps_existing_records() {
        let mut temperature_gap = with_cloud(hourly_record(ts(1995, 6, 1, 4)), None);
        temperature_gap.set(Field::Temperature, Observation::null(QualityCode::Missing));
        let records = vec![
            with_cloud(hourly_record(ts(1995, 6, 1, 3)), Some(0.8)),
            temperature_gap,
            with_cloud(hourly_record(ts(1995, 6, 1, 6)), Some(0.2)),
        ];
        let series = StationSeries::from_records(662, records).unwrap();
        let resampler =
            Resampler::new(ResampleConfig::default().with_discrete_fill(DiscreteFill::Linear));

        let (filled, count) = resampler.fill_fields(&series, &[Field::CloudCover]).unwrap();

        assert_eq!(count, 1);
        assert_eq!(filled.len(), 3);
        let fourth = &filled.records()[1];
        assert!((fourth.value(Field::CloudCover).unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(fourth.quality(Field::CloudCover), Some(QualityCode::Interpolated));
        // other fields are left alone
        assert_eq!(fourth.get(Field::Temperature), Some(Observation::null(QualityCode::Missing)));
    }

    #[test]
    fn test_resampling_is_deterministic() {
        let first = Resampler::default().resample(&cloud_series()).unwrap();
        let second = Resampler::default().resample(&cloud_series()).unwrap();
        assert_eq!(first.hourly, second.hourly);
        assert_eq!(first.gap_filled, second.gap_filled);
    }
}
