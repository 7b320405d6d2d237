//! Field-by-field comparison of a converted archive against a reference one.
//!
//! Both sides are normalized series; records are paired by station and
//! timestamp. Values are compared in raw archive units so a tolerance reads
//! the same way as the archive's own rounding. Reference archives that leave
//! off-schedule cloud hours unobserved (value 0, remark 2) are reported on
//! their own instead of counting as cloud differences.

use crate::models::{
    CanonicalRecord, Field, Observation, QualityCode, StationSeries, HOURLY_FIELDS,
};
use crate::processors::labelled_date_hour;
use crate::utils::constants::CLOUD_OBSERVATION_HOURS;
use crate::utils::units;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Share of paired records above which a field's differences are significant.
pub const SIGNIFICANT_PERCENT: f64 = 1.0;

const MAX_SAMPLES: usize = 3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub converted_records: usize,
    pub reference_records: usize,
    pub paired_records: usize,
    pub only_converted: usize,
    pub only_reference: usize,
    pub fields: BTreeMap<Field, FieldComparison>,
    pub unfilled_cloud: UnfilledCloud,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldComparison {
    pub value_differences: usize,
    pub quality_differences: usize,
    /// Raw-unit difference tolerated before two values count as different.
    pub tolerance: i64,
    /// Differences the web tables cannot avoid, such as absent weather codes.
    pub expected: bool,
    pub samples: Vec<ValueDifference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDifference {
    pub station_id: u32,
    pub timestamp: NaiveDateTime,
    pub converted: Option<f64>,
    pub reference: Option<f64>,
}

/// Off-schedule cloud hours the reference leaves unobserved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnfilledCloud {
    pub reference_hours: usize,
    /// Of those, hours where the converted archive carries a value.
    pub filled_in_converted: usize,
    pub samples: Vec<ValueDifference>,
}

impl UnfilledCloud {
    pub fn detected(&self) -> bool {
        self.reference_hours > 0
    }
}

impl VerificationReport {
    pub fn difference_percent(&self, count: usize) -> f64 {
        if self.paired_records == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.paired_records as f64
        }
    }

    /// Fields whose value differences exceed the significance share, expected
    /// differences aside.
    pub fn significant_fields(&self) -> Vec<Field> {
        self.fields
            .iter()
            .filter(|(_, c)| !c.expected)
            .filter(|(_, c)| self.difference_percent(c.value_differences) > SIGNIFICANT_PERCENT)
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn core_data_matches(&self) -> bool {
        self.significant_fields().is_empty()
    }
}

/// Pairs converted and reference records and counts where they disagree.
pub struct ConversionVerifier {
    tolerances: HashMap<Field, i64>,
}

impl ConversionVerifier {
    /// Solar radiation tolerates one raw unit of rounding; everything else
    /// must match exactly.
    pub fn new() -> Self {
        let mut tolerances = HashMap::new();
        tolerances.insert(Field::SolarRadiation, 1);
        Self { tolerances }
    }

    pub fn with_tolerance(mut self, field: Field, raw_units: i64) -> Self {
        self.tolerances.insert(field, raw_units);
        self
    }

    pub fn compare(
        &self,
        converted: &[StationSeries],
        reference: &[StationSeries],
    ) -> VerificationReport {
        let mut report = VerificationReport::default();
        for field in compared_fields() {
            report.fields.insert(
                field,
                FieldComparison {
                    tolerance: self.tolerance(field),
                    expected: field == Field::WeatherCode,
                    ..FieldComparison::default()
                },
            );
        }

        let mut references: HashMap<(u32, NaiveDateTime), &CanonicalRecord> = HashMap::new();
        for series in reference {
            report.reference_records += series.len();
            for record in series.records() {
                references.insert((record.station_id, record.timestamp), record);
            }
        }

        for series in converted {
            report.converted_records += series.len();
            for record in series.records() {
                match references.remove(&(record.station_id, record.timestamp)) {
                    Some(other) => {
                        report.paired_records += 1;
                        self.compare_records(record, other, &mut report);
                    }
                    None => report.only_converted += 1,
                }
            }
        }
        report.only_reference = references.len();
        report
    }

    fn compare_records(
        &self,
        converted: &CanonicalRecord,
        reference: &CanonicalRecord,
        report: &mut VerificationReport,
    ) {
        let (date, hour) = labelled_date_hour(converted.timestamp);
        for field in compared_fields() {
            let ours = converted.get(field).unwrap_or_else(Observation::not_created);
            let theirs = reference.get(field).unwrap_or_else(Observation::not_created);
            let difference = ValueDifference {
                station_id: converted.station_id,
                timestamp: converted.timestamp,
                converted: ours.value,
                reference: theirs.value,
            };

            if field == Field::CloudCover
                && !CLOUD_OBSERVATION_HOURS.contains(&hour)
                && theirs.is_null()
                && theirs.quality == QualityCode::NotObserved
            {
                let unfilled = &mut report.unfilled_cloud;
                unfilled.reference_hours += 1;
                if ours.value.is_some() {
                    unfilled.filled_in_converted += 1;
                    if unfilled.samples.len() < MAX_SAMPLES {
                        unfilled.samples.push(difference);
                    }
                }
                continue;
            }

            let Some(comparison) = report.fields.get_mut(&field) else {
                continue;
            };
            if ours.quality != theirs.quality {
                comparison.quality_differences += 1;
            }
            let differs = match (ours.value, theirs.value) {
                (None, None) => false,
                (Some(a), Some(b)) => {
                    match (units::to_raw(field, a, date), units::to_raw(field, b, date)) {
                        (Ok(a), Ok(b)) => (a - b).abs() > comparison.tolerance,
                        _ => a != b,
                    }
                }
                _ => true,
            };
            if differs {
                comparison.value_differences += 1;
                if comparison.samples.len() < MAX_SAMPLES {
                    comparison.samples.push(difference);
                }
            }
        }
    }

    fn tolerance(&self, field: Field) -> i64 {
        self.tolerances.get(&field).copied().unwrap_or(0)
    }

    pub fn generate_summary(&self, report: &VerificationReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Conversion Verification Report ===\n");
        summary.push_str(&format!(
            "Records: converted {}, reference {}, paired {}\n",
            report.converted_records, report.reference_records, report.paired_records
        ));
        if report.only_converted > 0 || report.only_reference > 0 {
            summary.push_str(&format!(
                "Unpaired: {} only in converted, {} only in reference\n",
                report.only_converted, report.only_reference
            ));
        }

        summary.push_str("\nField differences:\n");
        for (field, comparison) in &report.fields {
            if comparison.value_differences == 0 && comparison.quality_differences == 0 {
                continue;
            }
            let percent = report.difference_percent(comparison.value_differences);
            let status = if comparison.expected {
                "expected"
            } else if percent > SIGNIFICANT_PERCENT {
                "SIGNIFICANT"
            } else {
                "minor"
            };
            summary.push_str(&format!(
                "  {:<24} {:>6} values ({:>5.2}%) {:>6} remarks  {}\n",
                field.as_str(),
                comparison.value_differences,
                percent,
                comparison.quality_differences,
                status
            ));
            for sample in &comparison.samples {
                summary.push_str(&format!("    {}\n", describe(sample)));
            }
        }

        let unfilled = &report.unfilled_cloud;
        if unfilled.detected() {
            summary.push_str(&format!(
                "\nReference leaves {} off-schedule cloud hours unobserved; {} are filled in the converted archive\n",
                unfilled.reference_hours, unfilled.filled_in_converted
            ));
            for sample in &unfilled.samples {
                summary.push_str(&format!("    {}\n", describe(sample)));
            }
        }

        if report.core_data_matches() {
            summary.push_str("\nCore data matches\n");
        } else {
            let fields: Vec<&str> = report
                .significant_fields()
                .iter()
                .map(|f| f.as_str())
                .collect();
            summary.push_str(&format!("\nUnexpected differences in: {}\n", fields.join(", ")));
        }
        summary
    }
}

impl Default for ConversionVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Archive fields; derived wind components are left out.
fn compared_fields() -> impl Iterator<Item = Field> {
    HOURLY_FIELDS.into_iter().filter(|f| !f.is_derived())
}

fn describe(sample: &ValueDifference) -> String {
    let show = |v: Option<f64>| v.map_or_else(|| "null".to_string(), |v| format!("{}", v));
    format!(
        "Station {} at {}: converted {}, reference {}",
        sample.station_id,
        sample.timestamp,
        show(sample.converted),
        show(sample.reference)
    )
}
