use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use gwo_processor::cli::{run, Cli};
use gwo_processor::config::{DiscreteFill, PipelineConfig, ResampleConfig};
use gwo_processor::models::{Field, QualityCode, SourceFormat, StationSeries};
use gwo_processor::processors::{ConversionVerifier, ParallelProcessor, Resampler, SeriesMerger};
use gwo_processor::readers::{ConcurrentReader, InputFile, LegacyReader};
use gwo_processor::writers::ParquetWriter;
use gwo_processor::{ProcessingError, Result};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn at(date: (i32, u32, u32), hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(date.0, date.1, date.2)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// One 33-column hourly archive row with the given temperature and cloud
/// (value, remark); every other field is a normal observation.
fn legacy_line(date: (i32, u32, u32), hour: u32, temperature: i32, cloud: (&str, &str)) -> String {
    let mut cells = vec![
        "662".to_string(),
        "東京".to_string(),
        "662".to_string(),
        date.0.to_string(),
        date.1.to_string(),
        date.2.to_string(),
        hour.to_string(),
    ];
    let temperature = temperature.to_string();
    let pairs = [
        ("10123", "8"),
        ("10150", "8"),
        (temperature.as_str(), "8"),
        ("52", "8"),
        ("85", "8"),
        ("3", "8"),
        ("21", "8"),
        cloud,
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
    cells.join(",")
}

fn write_file(dir: &Path, name: &str, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

async fn load_series(path: &Path, format: SourceFormat) -> Result<Vec<StationSeries>> {
    let tables = ConcurrentReader::new(1)
        .read_all(vec![InputFile::new(path, format)])
        .await?;
    let records = ParallelProcessor::new(1).normalize_tables(&tables)?;
    SeriesMerger::new().merge(records, &HashMap::new())
}

#[tokio::test]
async fn test_cloud_between_scheduled_observations() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(
        dir.path(),
        "cloud.csv",
        &[
            legacy_line((1995, 5, 1), 3, 150, ("8", "8")),
            legacy_line((1995, 5, 1), 4, 152, ("0", "2")),
            legacy_line((1995, 5, 1), 5, 154, ("0", "2")),
            legacy_line((1995, 5, 1), 6, 156, ("2", "8")),
        ],
    );
    let series = load_series(&path, SourceFormat::LegacyArchive).await?;

    let hold = Resampler::default().resample(&series[0])?;
    let linear = Resampler::new(ResampleConfig::default().with_discrete_fill(DiscreteFill::Linear))
        .resample(&series[0])?;

    let clouds = |output: &gwo_processor::processors::ResampleOutput| -> Vec<(Option<f64>, Option<QualityCode>)> {
        output
            .hourly
            .records()
            .iter()
            .map(|r| {
                (
                    r.value(Field::CloudCover).map(|v| (v * 10.0).round() / 10.0),
                    r.quality(Field::CloudCover),
                )
            })
            .collect()
    };

    assert_eq!(
        clouds(&hold),
        vec![
            (Some(0.8), Some(QualityCode::Normal)),
            (Some(0.8), Some(QualityCode::Interpolated)),
            (Some(0.8), Some(QualityCode::Interpolated)),
            (Some(0.2), Some(QualityCode::Normal)),
        ]
    );
    assert_eq!(
        clouds(&linear),
        vec![
            (Some(0.8), Some(QualityCode::Normal)),
            (Some(0.6), Some(QualityCode::Interpolated)),
            (Some(0.4), Some(QualityCode::Interpolated)),
            (Some(0.2), Some(QualityCode::Normal)),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_hour_24_becomes_next_midnight() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(
        dir.path(),
        "new_year.csv",
        &[
            legacy_line((2020, 12, 31), 23, 10, ("5", "8")),
            legacy_line((2020, 12, 31), 24, 5, ("5", "8")),
        ],
    );
    let series = load_series(&path, SourceFormat::LegacyArchive).await?;
    let output = Resampler::default().resample(&series[0])?;

    let timestamps: Vec<NaiveDateTime> =
        output.hourly.records().iter().map(|r| r.timestamp).collect();
    assert_eq!(
        timestamps,
        vec![at((2020, 12, 31), 23), at((2021, 1, 1), 0)]
    );
    assert!(!timestamps.contains(&at((2020, 12, 31), 0)));
    Ok(())
}

#[tokio::test]
async fn test_missing_row_is_synthesized() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_file(
        dir.path(),
        "gap.csv",
        &[
            legacy_line((2001, 7, 1), 1, 248, ("5", "8")),
            legacy_line((2001, 7, 1), 2, 250, ("0", "2")),
            legacy_line((2001, 7, 1), 4, 260, ("0", "2")),
        ],
    );
    let series = load_series(&path, SourceFormat::LegacyArchive).await?;
    let output = Resampler::default().resample(&series[0])?;

    let synthesized = &output.gap_filled.records()[2];
    assert_eq!(synthesized.timestamp, at((2001, 7, 1), 3));
    assert_eq!(synthesized.value(Field::Temperature), None);
    assert_eq!(
        synthesized.quality(Field::Temperature),
        Some(QualityCode::NotCreated)
    );
    assert_eq!(output.stats.synthesized_records, 1);

    let filled = &output.hourly.records()[2];
    assert_eq!(filled.value(Field::Temperature), Some(25.5));
    assert_eq!(
        filled.quality(Field::Temperature),
        Some(QualityCode::Interpolated)
    );
    // accumulative fields are never interpolated
    assert_eq!(filled.value(Field::Precipitation), None);
    Ok(())
}

#[test]
fn test_min_sea_level_pressure_offset_by_era() -> Result<()> {
    let daily_line = |year: i32| {
        let mut cells = vec![
            "662".to_string(),
            "東京".to_string(),
            "662".to_string(),
            year.to_string(),
            "1".to_string(),
            "15".to_string(),
        ];
        for i in 0..23 {
            let (value, remark) = if i == 2 { ("10050", "8") } else { ("0", "0") };
            cells.push(value.to_string());
            cells.push(remark.to_string());
        }
        cells.join(",")
    };

    let dir = TempDir::new()?;
    let path = write_file(dir.path(), "daily.csv", &[daily_line(1995), daily_line(2005)]);

    let table = LegacyReader::new().read_table(&path, SourceFormat::LegacyDailyArchive)?;
    let records = ParallelProcessor::new(1).normalize_tables(&[table])?;

    assert_eq!(records[0].value(Field::MinSeaLevelPressure), Some(5.0));
    assert_eq!(records[1].value(Field::MinSeaLevelPressure), Some(1005.0));
    assert_eq!(
        records[1].quality(Field::MeanTemperature),
        Some(QualityCode::NotCreated)
    );

    // daily series cannot be resampled to hourly
    let series = SeriesMerger::new().merge(records, &HashMap::new())?;
    assert!(Resampler::default().resample(&series[0]).is_err());
    Ok(())
}

#[tokio::test]
async fn test_process_command_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_file(
        dir.path(),
        "tokyo_1985.csv",
        &[
            legacy_line((1985, 4, 1), 3, 100, ("8", "8")),
            legacy_line((1985, 4, 1), 6, 130, ("2", "8")),
            legacy_line((1985, 4, 1), 12, 190, ("4", "8")),
        ],
    );
    let catalog = dir.path().join("stations.csv");
    fs::write(
        &catalog,
        "station_id,name,name_jp,latitude,longitude,elevation,observation_start\n\
         662,Tokyo,東京,35:41.3,139:45.6,25.2,\n",
    )?;
    let hourly = dir.path().join("out").join("hourly.parquet");
    let gap_filled = dir.path().join("out").join("gap_filled.parquet");
    let report = dir.path().join("report.json");

    let cli = Cli::parse_from([
        "gwo-processor",
        "process",
        input.to_str().unwrap(),
        "--stations",
        catalog.to_str().unwrap(),
        "-o",
        hourly.to_str().unwrap(),
        "--gap-filled-file",
        gap_filled.to_str().unwrap(),
        "--output-format",
        "parquet",
        "--report-file",
        report.to_str().unwrap(),
        "--max-workers",
        "2",
    ]);
    run(cli).await?;

    let writer = ParquetWriter::new();
    let hours = writer.read_records(&hourly, 100)?;
    assert_eq!(hours.len(), 10);
    assert_eq!(hours[0].timestamp, at((1985, 4, 1), 3));
    assert_eq!(hours[9].timestamp, at((1985, 4, 1), 12));
    // 06:00 to 12:00 is wider than the default gap
    assert_eq!(hours[4].value(Field::Temperature), None);
    assert_eq!(
        hours[4].quality(Field::Temperature),
        Some(QualityCode::NotCreated)
    );
    assert_eq!(hours[1].quality(Field::Temperature), Some(QualityCode::Interpolated));

    let native = writer.read_records(&gap_filled, 100)?;
    let native_hours: Vec<NaiveDateTime> = native.iter().map(|r| r.timestamp).collect();
    assert_eq!(
        native_hours,
        vec![
            at((1985, 4, 1), 3),
            at((1985, 4, 1), 6),
            at((1985, 4, 1), 9),
            at((1985, 4, 1), 12),
        ]
    );

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(json["total_records"], 10);
    Ok(())
}

#[tokio::test]
async fn test_convert_web_table_to_archive_rows() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("web.csv");
    fs::write(
        &input,
        "年月日時,気温(℃),降水量(mm),風向,風速(m/s),雲量\n\
         2021/01/01 00:00:00,-1.5,--,静穏,0.2,3\n",
    )?;
    let output = dir.path().join("gwo.csv");

    let cli = Cli::parse_from([
        "gwo-processor",
        "convert",
        input.to_str().unwrap(),
        "--format",
        "web",
        "--station-id",
        "662",
        "-o",
        output.to_str().unwrap(),
    ]);
    run(cli).await?;

    let text = fs::read_to_string(&output)?;
    let cells: Vec<&str> = text.trim_end().split(',').collect();
    assert_eq!(cells.len(), 33);
    assert_eq!(&cells[2..7], &["662", "2020", "12", "31", "24"]);
    // temperature, wind direction (calm), cloud, precipitation
    assert_eq!(&cells[11..13], &["-15", "8"]);
    assert_eq!(&cells[17..19], &["0", "8"]);
    assert_eq!(&cells[21..23], &["3", "8"]);
    assert_eq!(&cells[31..33], &["0", "6"]);
    Ok(())
}

#[tokio::test]
async fn test_convert_fills_off_schedule_cloud() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("web.csv");
    fs::write(
        &input,
        "年月日時,気温(℃),雲量\n\
         2021/01/01 03:00:00,1.0,8\n\
         2021/01/01 04:00:00,1.2,\n\
         2021/01/01 05:00:00,1.4,\n\
         2021/01/01 06:00:00,1.6,2\n",
    )?;
    let output = dir.path().join("gwo.csv");

    let cli = Cli::parse_from([
        "gwo-processor",
        "convert",
        input.to_str().unwrap(),
        "--format",
        "web",
        "--station-id",
        "662",
        "-o",
        output.to_str().unwrap(),
    ]);
    run(cli).await?;

    let text = fs::read_to_string(&output)?;
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(|line| line.split(',').collect())
        .collect();
    assert_eq!(rows.len(), 4);

    let cloud: Vec<[&str; 2]> = rows.iter().map(|r| [r[21], r[22]]).collect();
    assert_eq!(cloud, vec![["8", "8"], ["6", "8"], ["4", "8"], ["2", "8"]]);

    // Filled hours read back as values, not as unobserved cloud
    let reread = LegacyReader::new().read_table(&output, SourceFormat::LegacyArchive)?;
    let records = ParallelProcessor::new(1).normalize_tables(&[reread])?;
    let filled = records
        .iter()
        .find(|r| r.timestamp == at((2021, 1, 1), 4))
        .unwrap();
    assert_eq!(filled.quality(Field::CloudCover), Some(QualityCode::Normal));
    assert!((filled.value(Field::CloudCover).unwrap() - 0.6).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_convert_without_cloud_fill() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("web.csv");
    fs::write(
        &input,
        "年月日時,気温(℃),雲量\n\
         2021/01/01 03:00:00,1.0,8\n\
         2021/01/01 04:00:00,1.2,\n\
         2021/01/01 06:00:00,1.6,2\n",
    )?;
    let output = dir.path().join("gwo.csv");

    let cli = Cli::parse_from([
        "gwo-processor",
        "convert",
        input.to_str().unwrap(),
        "--format",
        "web",
        "--station-id",
        "662",
        "-o",
        output.to_str().unwrap(),
        "--no-cloud-fill",
    ]);
    run(cli).await?;

    let text = fs::read_to_string(&output)?;
    let second: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
    assert_eq!(&second[21..23], &["0", "2"]);
    Ok(())
}

async fn convert_web(dir: &Path, name: &str, table: &str, extra: &[&str]) -> Result<std::path::PathBuf> {
    let input = dir.join(format!("{}.web.csv", name));
    fs::write(&input, table)?;
    let output = dir.join(format!("{}.csv", name));

    let mut args = vec![
        "gwo-processor".to_string(),
        "convert".to_string(),
        input.to_string_lossy().into_owned(),
        "--format".to_string(),
        "web".to_string(),
        "--station-id".to_string(),
        "662".to_string(),
        "-o".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    args.extend(extra.iter().map(|a| a.to_string()));
    run(Cli::parse_from(args)).await?;
    Ok(output)
}

const CLOUD_TABLE: &str = "年月日時,気温(℃),雲量\n\
    2021/01/01 03:00:00,1.0,8\n\
    2021/01/01 04:00:00,1.2,\n\
    2021/01/01 05:00:00,1.4,\n\
    2021/01/01 06:00:00,1.6,2\n";

#[tokio::test]
async fn test_verify_reports_unfilled_reference_cloud() -> Result<()> {
    let dir = TempDir::new()?;
    let converted = convert_web(dir.path(), "converted", CLOUD_TABLE, &[]).await?;
    let reference = convert_web(dir.path(), "reference", CLOUD_TABLE, &["--no-cloud-fill"]).await?;

    let tables = ConcurrentReader::new(2)
        .read_all(vec![
            InputFile::new(&converted, SourceFormat::LegacyArchive),
            InputFile::new(&reference, SourceFormat::LegacyArchive),
        ])
        .await?;
    let processor = ParallelProcessor::new(1);
    let ours = SeriesMerger::new().merge(processor.normalize_tables(&tables[..1])?, &HashMap::new())?;
    let theirs = SeriesMerger::new().merge(processor.normalize_tables(&tables[1..])?, &HashMap::new())?;

    let report = ConversionVerifier::new().compare(&ours, &theirs);
    assert_eq!(report.paired_records, 4);
    assert_eq!(report.unfilled_cloud.reference_hours, 2);
    assert_eq!(report.unfilled_cloud.filled_in_converted, 2);
    assert_eq!(report.fields[&Field::Temperature].value_differences, 0);
    assert!(report.core_data_matches());

    let cli = Cli::parse_from([
        "gwo-processor",
        "verify",
        converted.to_str().unwrap(),
        reference.to_str().unwrap(),
        "--json",
    ]);
    run(cli).await?;
    Ok(())
}

#[tokio::test]
async fn test_verify_fails_on_core_differences() -> Result<()> {
    let dir = TempDir::new()?;
    let converted = convert_web(dir.path(), "converted", CLOUD_TABLE, &[]).await?;
    let warmer = CLOUD_TABLE.replace(",1.", ",2.");
    let reference = convert_web(dir.path(), "reference", &warmer, &[]).await?;

    let cli = Cli::parse_from([
        "gwo-processor",
        "verify",
        converted.to_str().unwrap(),
        reference.to_str().unwrap(),
    ]);
    let error = run(cli).await.unwrap_err();
    assert!(matches!(
        error,
        ProcessingError::VerificationFailed { ref fields } if fields == &["temperature".to_string()]
    ));
    Ok(())
}

#[test]
fn test_default_pipeline_config() {
    let config = PipelineConfig::default();
    assert_eq!(config.resampler.max_interpolation_gap_hours, 3);
    assert_eq!(config.resampler.discrete_fill, DiscreteFill::HoldForward);
}
