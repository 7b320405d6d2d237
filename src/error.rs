use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::Field;

pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Why a station series was rejected by the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    Duplicate,
    OutOfOrder,
    ForeignStation(u32),
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityViolation::Duplicate => write!(f, "duplicate timestamp"),
            IntegrityViolation::OutOfOrder => write!(f, "timestamp out of order"),
            IntegrityViolation::ForeignStation(other) => {
                write!(f, "record belongs to station {}", other)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error(
        "Quality decode error in field {field}: unrecognised token '{token}'{}",
        .line.map(|l| format!(" (line {})", l)).unwrap_or_default()
    )]
    Decode {
        field: Field,
        token: String,
        line: Option<usize>,
    },

    #[error("No unit conversion rule for field {field} on {date}: {reason}")]
    UnsupportedConversion {
        field: Field,
        date: NaiveDate,
        reason: String,
    },

    #[error("Row decode error at line {line}: {message}")]
    RowDecode { line: usize, message: String },

    #[error("Series integrity error for station {station_id} at {timestamp}: {violation}")]
    SeriesIntegrity {
        station_id: u32,
        timestamp: NaiveDateTime,
        violation: IntegrityViolation,
    },

    #[error("Station {station_id} not found")]
    StationNotFound { station_id: u32 },

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate format: {0}")]
    InvalidCoordinate(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Converted archive differs from the reference in: {}", .fields.join(", "))]
    VerificationFailed { fields: Vec<String> },

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Attach the input line to a decode error raised below the row level.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            ProcessingError::Decode { field, token, .. } => ProcessingError::Decode {
                field,
                token,
                line: Some(line),
            },
            other => other,
        }
    }

    /// Errors that invalidate the record boundary and must abort the file.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(
            self,
            ProcessingError::RowDecode { .. } | ProcessingError::SeriesIntegrity { .. }
        )
    }
}
