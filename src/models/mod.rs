pub mod field;
pub mod quality;
pub mod record;
pub mod series;
pub mod station;
pub mod wind;

pub use field::{Field, FieldFamily, Resolution, DAILY_FIELDS, HOURLY_FIELDS};
pub use quality::{NullPolicy, QualityCode};
pub use record::{canonical_timestamp, CanonicalRecord, Observation, RawRow, SourceFormat};
pub use series::StationSeries;
pub use station::StationMetadata;
pub use wind::WindDirectionEntry;
