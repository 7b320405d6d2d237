use crate::cli::args::{Cli, Commands, InputArgs, ResampleArgs};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalRecord, Field, SourceFormat, StationMetadata, StationSeries};
use crate::processors::{
    ConversionVerifier, IntegrityChecker, IntegrityReport, ParallelProcessor, Resampler,
    SeriesMerger,
};
use crate::readers::{ConcurrentReader, InputFile, StationReader};
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, LegacyWriter, OutputFormat, ParquetWriter};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use validator::Validate;

pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Process {
            input,
            resample,
            output_file,
            gap_filled_file,
            output_format,
            compression,
            report_file,
            dedupe,
            max_workers,
        } => {
            let config = load_config(cli.config.as_deref(), &input, Some(&resample))?;
            let stations = load_stations(&input)?;
            info!(
                "Processing {} files with {} workers",
                input.inputs.len(),
                max_workers
            );

            let progress = ProgressReporter::new_spinner("Processing observations...", false);
            let processor = ParallelProcessor::new(max_workers)
                .with_config(config)
                .with_dedupe(dedupe);
            let output = processor
                .process_all_data(
                    &input.reader(max_workers),
                    input.input_files(),
                    &stations,
                    Some(&progress),
                )
                .await?;

            for station in &output.stations {
                let stats = &station.stats;
                info!(
                    "Station {}: {} input, {} synthesized, {} hourly, {} interpolated",
                    station.hourly.station_id(),
                    stats.input_records,
                    stats.synthesized_records,
                    stats.hourly_records,
                    stats.interpolated_values
                );
            }

            let hourly: Vec<StationSeries> =
                output.stations.iter().map(|s| s.hourly.clone()).collect();
            write_series(&hourly, &output_file, output_format, &compression)?;
            println!("Hourly series written to {}", output_file.display());

            if let Some(path) = gap_filled_file {
                let gap_filled: Vec<StationSeries> =
                    output.stations.iter().map(|s| s.gap_filled.clone()).collect();
                write_series(&gap_filled, &path, output_format, &compression)?;
                println!("Gap-filled series written to {}", path.display());
            }

            let checker = IntegrityChecker::new();
            println!("\n{}", checker.generate_summary(&output.report));

            if let Some(path) = report_file {
                write_report(&output.report, &path)?;
            }
        }

        Commands::Normalize {
            input,
            output_file,
            output_format,
            max_workers,
        } => {
            let config = load_config(cli.config.as_deref(), &input, None)?;
            let records = read_and_normalize(&input, config, max_workers).await?;

            match output_format {
                OutputFormat::Csv => CsvWriter::new().write_records(&records, &output_file)?,
                OutputFormat::Parquet => {
                    ParquetWriter::new().write_records(&records, &output_file)?
                }
            }
            println!(
                "Wrote {} canonical records to {}",
                records.len(),
                output_file.display()
            );
        }

        Commands::Convert {
            input,
            output_file,
            output_encoding,
            discrete_fill,
            max_gap_hours,
            no_cloud_fill,
        } => {
            let fill = ResampleArgs {
                discrete_fill: Some(discrete_fill),
                max_gap_hours,
                ..ResampleArgs::default()
            };
            let config = load_config(cli.config.as_deref(), &input, Some(&fill))?;
            let stations = load_stations(&input)?;
            let resampler = Resampler::new(config.resampler.clone());
            let mut records = read_and_normalize(&input, config, 1).await?;

            if !no_cloud_fill {
                let series = SeriesMerger::new().merge(records, &stations)?;
                let mut filled_records = Vec::new();
                for station in &series {
                    let (filled, count) = resampler.fill_fields(station, &[Field::CloudCover])?;
                    info!("Station {}: {} cloud hours filled", station.station_id(), count);
                    filled_records.extend(filled.into_records());
                }
                records = filled_records;
            }

            LegacyWriter::new()
                .with_stations(&stations)
                .with_encoding(output_encoding)
                .write_records(&records, &output_file)?;
            println!(
                "Wrote {} archive rows to {}",
                records.len(),
                output_file.display()
            );
        }

        Commands::Validate {
            input,
            json,
            dedupe,
            max_workers,
        } => {
            let config = load_config(cli.config.as_deref(), &input, None)?;
            let stations = load_stations(&input)?;
            let records = read_and_normalize(&input, config, max_workers).await?;
            let series = SeriesMerger::with_dedupe(dedupe).merge(records, &stations)?;

            let checker = IntegrityChecker::new();
            let report = checker.check_integrity(&series);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", checker.generate_summary(&report));
                if report.violations.is_empty() {
                    println!("All records passed integrity checks");
                } else {
                    println!("Found {} integrity issues", report.violations.len());
                }
            }
        }

        Commands::Verify {
            converted,
            reference,
            encoding,
            tolerances,
            json,
        } => {
            let config = PipelineConfig::load(cli.config.as_deref())?;
            let mut verifier = ConversionVerifier::new();
            for (field, units) in tolerances {
                verifier = verifier.with_tolerance(field, units);
            }

            let reader = ConcurrentReader::new(2).with_encoding(encoding);
            let tables = reader
                .read_all(vec![
                    InputFile::new(converted, SourceFormat::LegacyArchive),
                    InputFile::new(reference, SourceFormat::LegacyArchive),
                ])
                .await?;
            let processor = ParallelProcessor::new(2).with_config(config);
            let merger = SeriesMerger::new();
            let mut sides = Vec::with_capacity(tables.len());
            for table in &tables {
                let records = processor.normalize_tables(std::slice::from_ref(table))?;
                sides.push(merger.merge(records, &HashMap::new())?);
            }
            let [ours, theirs] = sides.as_slice() else {
                return Err(ProcessingError::MissingData(
                    "verify needs a converted and a reference archive".to_string(),
                ));
            };

            let report = verifier.compare(ours, theirs);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", verifier.generate_summary(&report));
            }
            if report.unfilled_cloud.detected() {
                warn!(
                    "Reference archive leaves {} off-schedule cloud hours unobserved",
                    report.unfilled_cloud.reference_hours
                );
            }
            if !report.core_data_matches() {
                return Err(ProcessingError::VerificationFailed {
                    fields: report
                        .significant_fields()
                        .iter()
                        .map(|f| f.to_string())
                        .collect(),
                });
            }
        }

        Commands::Info { file, sample } => {
            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;
            println!("{}", file_info.summary());

            if sample > 0 {
                let records = writer.read_records(&file, sample)?;
                println!("\nSample Records (showing {} records):", records.len());
                CsvWriter::new().write_to(&records, std::io::stdout())?;
            }
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gwo_processor={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    // A subscriber installed earlier in the process stays in charge.
    if result.is_err() {
        debug!("Global subscriber already set; keeping it");
    } else {
        debug!("Logging initialized at level: {}", level);
    }
    Ok(())
}

/// Settings file and environment, then command-line flags on top.
fn load_config(
    path: Option<&Path>,
    input: &InputArgs,
    resample: Option<&ResampleArgs>,
) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)?;

    if input.strict {
        config.normalizer.strict = true;
    }
    if let Some(tag) = input.off_schedule_cloud {
        config.normalizer.off_schedule_cloud = tag;
    }

    if let Some(args) = resample {
        let mut resampler = config.resampler.clone();
        if let Some(fill) = args.discrete_fill {
            resampler = resampler.with_discrete_fill(fill);
        }
        if let Some(hours) = args.max_gap_hours {
            resampler = resampler.with_max_gap_hours(hours);
        }
        if let Some(date) = args.hourly_cutover {
            resampler = resampler.with_hourly_cutover(date);
        }
        if args.start.is_some() || args.end.is_some() {
            let start = args.start.or(resampler.range_start);
            let end = args.end.or(resampler.range_end);
            resampler = resampler.with_range(start, end);
        }
        config.resampler = resampler;
    }

    config.validate()?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

fn load_stations(input: &InputArgs) -> Result<HashMap<u32, StationMetadata>> {
    match &input.stations {
        Some(path) => {
            let stations = StationReader::with_skip_invalid(true).read_stations_map(path)?;
            info!("Loaded {} stations from {}", stations.len(), path.display());
            Ok(stations)
        }
        None => Ok(HashMap::new()),
    }
}

async fn read_and_normalize(
    input: &InputArgs,
    config: PipelineConfig,
    max_workers: usize,
) -> Result<Vec<CanonicalRecord>> {
    let tables = input
        .reader(max_workers)
        .read_all(input.input_files())
        .await?;
    let records = ParallelProcessor::new(max_workers)
        .with_config(config)
        .normalize_tables(&tables)?;
    if records.is_empty() {
        warn!("No records found in {} input files", input.inputs.len());
    }
    Ok(records)
}

fn write_series(
    series: &[StationSeries],
    path: &Path,
    format: OutputFormat,
    compression: &str,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    match format {
        OutputFormat::Csv => {
            let records: Vec<CanonicalRecord> = series
                .iter()
                .flat_map(|s| s.records().iter().cloned())
                .collect();
            CsvWriter::new().write_records(&records, path)
        }
        OutputFormat::Parquet => {
            let writer = ParquetWriter::new().with_compression(compression)?;
            writer.write_series(series, path)?;
            println!("\n{}", writer.get_file_info(path)?.summary());
            Ok(())
        }
    }
}

fn write_report(report: &IntegrityReport, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    info!("Integrity report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_start_flag_keeps_configured_end() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[resampler]")?;
        writeln!(file, "range_end = \"2020-01-31T23:00:00\"")?;

        let cli = Cli::try_parse_from([
            "gwo-processor",
            "process",
            "gwo.csv",
            "-o",
            "hourly.csv",
            "--start",
            "2020-01-02T00:00:00",
        ])
        .unwrap();
        let Commands::Process {
            input, resample, ..
        } = cli.command
        else {
            panic!("expected process");
        };

        let config = load_config(Some(file.path()), &input, Some(&resample))?;
        let day = |d: u32, h: u32| NaiveDate::from_ymd_opt(2020, 1, d).unwrap().and_hms_opt(h, 0, 0);
        assert_eq!(config.resampler.range_start, day(2, 0));
        assert_eq!(config.resampler.range_end, day(31, 23));
        Ok(())
    }
}
