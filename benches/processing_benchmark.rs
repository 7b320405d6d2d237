use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gwo_processor::config::{DiscreteFill, NormalizerConfig, ResampleConfig};
use gwo_processor::models::{Field, RawRow, SourceFormat, StationSeries};
use gwo_processor::processors::{IntegrityChecker, Normalizer, Resampler};
use gwo_processor::utils::coordinates::dm_to_decimal;
use gwo_processor::utils::units;

// Archive rows of one station, every `step` hours from the start of `year`.
fn create_legacy_rows(year: i32, days: usize, step: usize) -> Vec<RawRow> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let mut rows = Vec::new();

    for day in 0..days {
        let date = start + chrono::Duration::days(day as i64);
        for hour in (step..=24).step_by(step) {
            let temperature = (150 + (hour as i64) * 5 - (day as i64 % 7) * 10).to_string();
            let mut cells: Vec<String> = vec![
                "662".into(),
                "東京".into(),
                "662".into(),
                date.format("%Y").to_string(),
                date.format("%-m").to_string(),
                date.format("%-d").to_string(),
                hour.to_string(),
            ];
            let pairs = [
                ("10123", "8"),
                ("10150", "8"),
                (temperature.as_str(), "8"),
                ("52", "8"),
                ("85", "8"),
                ("3", "8"),
                ("21", "8"),
                ("7", "8"),
                ("2", "8"),
                ("-43", "8"),
                ("0", "2"),
                ("0", "2"),
                ("0", "6"),
            ];
            for (value, remark) in pairs {
                cells.push(value.to_string());
                cells.push(remark.to_string());
            }
            rows.push(RawRow::new(rows.len() + 1, cells));
        }
    }
    rows
}

fn create_series(year: i32, days: usize, step: usize) -> StationSeries {
    let rows = create_legacy_rows(year, days, step);
    let records = Normalizer::default()
        .normalize_rows(&rows, SourceFormat::LegacyArchive)
        .unwrap();
    StationSeries::from_records(662, records).unwrap()
}

fn benchmark_normalizer(c: &mut Criterion) {
    let rows = create_legacy_rows(1995, 30, 1);
    let normalizer = Normalizer::new(NormalizerConfig::default());

    c.bench_function("normalize_legacy_hourly", |b| {
        b.iter(|| {
            let records = normalizer
                .normalize_rows(black_box(&rows), SourceFormat::LegacyArchive)
                .unwrap();
            black_box(records.len())
        })
    });
}

fn benchmark_resampler(c: &mut Criterion) {
    let series = create_series(1985, 30, 3);

    for (name, fill) in [
        ("resample_3hourly_hold", DiscreteFill::HoldForward),
        ("resample_3hourly_linear", DiscreteFill::Linear),
    ] {
        let resampler = Resampler::new(
            ResampleConfig::default()
                .with_discrete_fill(fill)
                .with_max_gap_hours(6),
        );
        c.bench_function(name, |b| {
            b.iter(|| {
                let output = resampler.resample(black_box(&series)).unwrap();
                black_box(output.hourly.len())
            })
        });
    }
}

fn benchmark_integrity_checker(c: &mut Criterion) {
    let series = vec![create_series(1995, 20, 1)];

    c.bench_function("integrity_checker", |b| {
        b.iter(|| {
            let report = IntegrityChecker::new().check_integrity(black_box(&series));
            black_box(report.total_records)
        })
    });
}

fn benchmark_unit_conversion(c: &mut Criterion) {
    let dates = [
        NaiveDate::from_ymd_opt(1975, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(1995, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
    ];
    let fields = [
        Field::Temperature,
        Field::RelativeHumidity,
        Field::SolarRadiation,
        Field::WindDirection,
        Field::MinSeaLevelPressure,
    ];

    c.bench_function("unit_round_trip", |b| {
        b.iter(|| {
            let mut total = 0i64;
            for date in &dates {
                for field in &fields {
                    if let Ok(physical) = units::to_physical(*field, 9, *date) {
                        total += units::to_raw(*field, physical, *date).unwrap_or(0);
                    }
                }
            }
            black_box(total)
        })
    });
}

fn benchmark_coordinate_conversion(c: &mut Criterion) {
    let coordinates = ["35:41.3", "139:45.6", "43:03.4", "141:19.7", "26:12.4"];

    c.bench_function("coordinate_conversion", |b| {
        b.iter(|| {
            let results: Vec<f64> = coordinates
                .iter()
                .filter_map(|dm| dm_to_decimal(dm).ok())
                .collect();
            black_box(results.len())
        })
    });
}

fn benchmark_varying_series_lengths(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_by_days");
    let resampler = Resampler::default();

    for &days in &[7, 30, 90, 365] {
        let series = create_series(1985, days, 3);
        group.bench_with_input(BenchmarkId::new("days", days), &series, |b, series| {
            b.iter(|| black_box(resampler.resample(series).unwrap().hourly.len()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_normalizer,
    benchmark_resampler,
    benchmark_integrity_checker,
    benchmark_unit_conversion,
    benchmark_coordinate_conversion,
    benchmark_varying_series_lengths
);
criterion_main!(benches);
