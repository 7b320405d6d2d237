use crate::models::{CanonicalRecord, Field, QualityCode, StationSeries};
use crate::utils::constants::{max_hourly_change, physical_bounds};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub total_records: usize,
    pub clean_records: usize,
    pub flagged_records: usize,
    pub violations: Vec<ObservationViolation>,
    pub station_statistics: BTreeMap<u32, StationStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObservationViolation {
    pub station_id: u32,
    pub timestamp: NaiveDateTime,
    pub field: Option<Field>,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    OutOfRange,
    SuspiciousJump,
    /// Null tagged with a code that marks neither absence nor an unscheduled hour.
    UntaggedNull,
    /// Accumulative zero tagged as never created or missing.
    MistaggedZero,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StationStatistics {
    pub total_records: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    /// Count of each remark code per field.
    pub quality_counts: BTreeMap<Field, BTreeMap<QualityCode, usize>>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
}

impl StationStatistics {
    pub fn count(&self, field: Field, code: QualityCode) -> usize {
        self.quality_counts
            .get(&field)
            .and_then(|codes| codes.get(&code))
            .copied()
            .unwrap_or(0)
    }
}

/// Checks canonical series against the record invariants and plausible physics.
pub struct IntegrityChecker {
    check_jumps: bool,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self { check_jumps: true }
    }

    pub fn with_jump_check(check_jumps: bool) -> Self {
        Self { check_jumps }
    }

    pub fn check_integrity(&self, series: &[StationSeries]) -> IntegrityReport {
        let mut report = IntegrityReport::default();
        for station in series {
            self.check_series(station, &mut report);
        }
        report
    }

    pub fn check_series(&self, series: &StationSeries, report: &mut IntegrityReport) {
        let stats = report
            .station_statistics
            .entry(series.station_id())
            .or_default();
        stats.total_records += series.len();
        stats.first_timestamp = match (stats.first_timestamp, series.first_timestamp()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        stats.last_timestamp = stats.last_timestamp.max(series.last_timestamp());

        for record in series.records() {
            tally(record, stats);
        }

        report.total_records += series.len();
        for record in series.records() {
            let before = report.violations.len();
            check_record(record, &mut report.violations);
            if report.violations.len() == before {
                report.clean_records += 1;
            } else {
                report.flagged_records += 1;
            }
        }

        if self.check_jumps {
            for window in series.records().windows(2) {
                check_jump(&window[0], &window[1], &mut report.violations);
            }
        }
    }

    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();
        let percent = |n: usize| {
            if report.total_records == 0 {
                0.0
            } else {
                100.0 * n as f64 / report.total_records as f64
            }
        };

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Stations: {}\n", report.station_statistics.len()));
        summary.push_str(&format!("Total Records: {}\n", report.total_records));
        summary.push_str(&format!(
            "Clean Records: {} ({:.1}%)\n",
            report.clean_records,
            percent(report.clean_records)
        ));
        summary.push_str(&format!(
            "Flagged Records: {} ({:.1}%)\n",
            report.flagged_records,
            percent(report.flagged_records)
        ));
        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));

        for (station_id, stats) in &report.station_statistics {
            let span = match (stats.first_timestamp, stats.last_timestamp) {
                (Some(first), Some(last)) => format!("{} .. {}", first, last),
                _ => "empty".to_string(),
            };
            summary.push_str(&format!(
                "\nStation {}: {} records, {}\n",
                station_id, stats.total_records, span
            ));
            if let (Some(min), Some(max)) = (stats.min_temperature, stats.max_temperature) {
                summary.push_str(&format!("  Temperature range: {:.1} .. {:.1} °C\n", min, max));
            }
            for (field, codes) in &stats.quality_counts {
                let counts: Vec<String> = codes
                    .iter()
                    .map(|(code, n)| format!("{}={}", code.as_u8(), n))
                    .collect();
                summary.push_str(&format!("  {:<24} {}\n", field.as_str(), counts.join(" ")));
            }
        }

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. Station {} at {}: {}\n",
                    i + 1,
                    violation.station_id,
                    violation.timestamp,
                    violation.details
                ));
            }
        }

        summary
    }
}

fn tally(record: &CanonicalRecord, stats: &mut StationStatistics) {
    for (field, observation) in record.observations() {
        *stats
            .quality_counts
            .entry(field)
            .or_default()
            .entry(observation.quality)
            .or_default() += 1;
    }

    let temperature = record
        .value(Field::Temperature)
        .or_else(|| record.value(Field::MeanTemperature));
    if let Some(t) = temperature {
        stats.min_temperature = Some(stats.min_temperature.map_or(t, |m| m.min(t)));
        stats.max_temperature = Some(stats.max_temperature.map_or(t, |m| m.max(t)));
    }
}

fn check_record(record: &CanonicalRecord, violations: &mut Vec<ObservationViolation>) {
    for (field, observation) in record.observations() {
        let mut push = |violation_type: ViolationType, details: String| {
            violations.push(ObservationViolation {
                station_id: record.station_id,
                timestamp: record.timestamp,
                field: Some(field),
                violation_type,
                details,
            })
        };

        match observation.value {
            None if !observation.quality.is_fillable() => push(
                ViolationType::UntaggedNull,
                format!("{} is null but tagged {}", field, observation.quality),
            ),
            Some(value) => {
                if let Some((low, high)) = physical_bounds(field) {
                    if !(low..=high).contains(&value) {
                        push(
                            ViolationType::OutOfRange,
                            format!(
                                "{} {} {} is outside [{}, {}]",
                                field,
                                value,
                                field.unit(),
                                low,
                                high
                            ),
                        );
                    }
                }
            }
            None => {}
        }
    }

    if !record.has_valid_zero_tags() {
        violations.push(ObservationViolation {
            station_id: record.station_id,
            timestamp: record.timestamp,
            field: None,
            violation_type: ViolationType::MistaggedZero,
            details: "accumulative zero tagged as not created or missing".to_string(),
        });
    }
}

fn check_jump(
    prev: &CanonicalRecord,
    curr: &CanonicalRecord,
    violations: &mut Vec<ObservationViolation>,
) {
    if curr.timestamp - prev.timestamp != Duration::hours(1) {
        return;
    }

    for (field, observation) in curr.observations() {
        let Some(limit) = max_hourly_change(field) else {
            continue;
        };
        if let (Some(before), Some(after)) = (prev.value(field), observation.value) {
            let jump = (after - before).abs();
            if jump > limit {
                violations.push(ObservationViolation {
                    station_id: curr.station_id,
                    timestamp: curr.timestamp,
                    field: Some(field),
                    violation_type: ViolationType::SuspiciousJump,
                    details: format!(
                        "{} jumped {:.1} {} from {} to {}",
                        field,
                        jump,
                        field.unit(),
                        prev.timestamp,
                        curr.timestamp
                    ),
                });
            }
        }
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}
