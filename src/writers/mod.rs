pub mod csv_writer;
pub mod legacy_writer;
pub mod parquet_writer;

pub use csv_writer::CsvWriter;
pub use legacy_writer::LegacyWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};

use crate::models::{CanonicalRecord, Field};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Output container for canonical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

/// Every field present in any record, in canonical order.
pub fn field_columns<'a>(records: impl IntoIterator<Item = &'a CanonicalRecord>) -> Vec<Field> {
    let fields: BTreeSet<Field> = records.into_iter().flat_map(|r| r.fields()).collect();
    fields.into_iter().collect()
}

/// Remark column name of a field.
pub fn remark_column(field: Field) -> String {
    format!("{}_rmk", field.as_str())
}
