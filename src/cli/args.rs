use crate::config::{DiscreteFill, OffScheduleCloud};
use crate::models::{Field, SourceFormat};
use crate::readers::{ConcurrentReader, InputFile, TextEncoding};
use crate::writers::OutputFormat;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gwo-processor")]
#[command(about = "Normalize and resample Japanese surface-weather archives")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Settings file (TOML, JSON or YAML); GWO__* variables override it"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize hourly inputs, resample each station and write the hourly series
    Process {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        resample: ResampleArgs,

        #[arg(short, long, help = "Hourly output file")]
        output_file: PathBuf,

        #[arg(long, help = "Also write the gap-filled native series here")]
        gap_filled_file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        output_format: OutputFormat,

        #[arg(long, default_value = "snappy")]
        compression: String,

        #[arg(long, help = "Write the integrity report as JSON")]
        report_file: Option<PathBuf>,

        #[arg(long, help = "Keep the last record of a repeated timestamp")]
        dedupe: bool,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Normalize inputs of any format to canonical records
    Normalize {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long)]
        output_file: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        output_format: OutputFormat,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Re-encode hourly observations as archive rows
    Convert {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long)]
        output_file: PathBuf,

        #[arg(long, value_enum, default_value_t = TextEncoding::Utf8)]
        output_encoding: TextEncoding,

        #[arg(
            long,
            value_enum,
            default_value_t = DiscreteFill::Linear,
            help = "How off-schedule cloud hours are filled"
        )]
        discrete_fill: DiscreteFill,

        #[arg(long, help = "Widest gap, in hours, bridged when filling cloud")]
        max_gap_hours: Option<u32>,

        #[arg(long, help = "Write off-schedule cloud hours as not observed")]
        no_cloud_fill: bool,
    },

    /// Normalize inputs and report their integrity without writing records
    Validate {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,

        #[arg(long, help = "Keep the last record of a repeated timestamp")]
        dedupe: bool,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Compare a converted archive with a reference archive, field by field
    Verify {
        #[arg(help = "Archive written by convert")]
        converted: PathBuf,

        #[arg(help = "Reference archive of the same station and period")]
        reference: PathBuf,

        #[arg(long, value_enum, default_value_t = TextEncoding::Auto)]
        encoding: TextEncoding,

        #[arg(
            long = "tolerance",
            value_parser = parse_tolerance,
            help = "Raw-unit tolerance for one field, as FIELD=UNITS (repeatable)"
        )]
        tolerances: Vec<(Field, i64)>,

        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },

    /// Display information about a Parquet output file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

/// Layout of the input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Hourly archive rows
    Legacy,
    /// Daily archive rows
    LegacyDaily,
    /// Web observation tables
    Web,
}

impl From<InputFormat> for SourceFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Legacy => SourceFormat::LegacyArchive,
            InputFormat::LegacyDaily => SourceFormat::LegacyDailyArchive,
            InputFormat::Web => SourceFormat::ModernWeb,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    #[arg(required = true, help = "Input files")]
    pub inputs: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = InputFormat::Legacy)]
    pub format: InputFormat,

    #[arg(short, long, help = "Station of web tables, which carry none")]
    pub station_id: Option<u32>,

    #[arg(long, help = "Station catalog CSV")]
    pub stations: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = TextEncoding::Auto)]
    pub encoding: TextEncoding,

    #[arg(long, default_value = "0", help = "Lines before the web table header")]
    pub skip_lines: usize,

    #[arg(long, help = "Memory-map archive files")]
    pub mmap: bool,

    #[arg(long, help = "Fail on malformed cells instead of recording them as missing")]
    pub strict: bool,

    #[arg(long, value_enum)]
    pub off_schedule_cloud: Option<OffScheduleCloud>,
}

impl InputArgs {
    pub fn source_format(&self) -> SourceFormat {
        self.format.into()
    }

    pub fn input_files(&self) -> Vec<InputFile> {
        self.inputs
            .iter()
            .map(|path| {
                InputFile::new(path, self.source_format()).with_station_id(self.station_id)
            })
            .collect()
    }

    pub fn reader(&self, max_workers: usize) -> ConcurrentReader {
        ConcurrentReader::new(max_workers)
            .with_encoding(self.encoding)
            .with_mmap(self.mmap)
            .with_skip_lines(self.skip_lines)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResampleArgs {
    #[arg(long, value_enum)]
    pub discrete_fill: Option<DiscreteFill>,

    #[arg(long, help = "Widest gap, in hours, bridged by interpolation")]
    pub max_gap_hours: Option<u32>,

    #[arg(long, help = "First day of hourly observation (YYYY-MM-DD)")]
    pub hourly_cutover: Option<NaiveDate>,

    #[arg(long, help = "Start of the hourly output (YYYY-MM-DDTHH:MM:SS)")]
    pub start: Option<NaiveDateTime>,

    #[arg(long, help = "End of the hourly output (YYYY-MM-DDTHH:MM:SS)")]
    pub end: Option<NaiveDateTime>,
}

/// `solar_radiation=2` style field tolerance.
fn parse_tolerance(value: &str) -> Result<(Field, i64), String> {
    let (name, units) = value
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=UNITS, got '{}'", value))?;
    let field =
        Field::from_name(name.trim()).ok_or_else(|| format!("unknown field '{}'", name))?;
    let units = units
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid tolerance '{}': {}", units, e))?;
    Ok((field, units))
}
