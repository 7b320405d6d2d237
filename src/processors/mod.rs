pub mod conversion_verifier;
pub mod integrity_checker;
pub mod normalizer;
pub mod parallel_processor;
pub mod resampler;
pub mod series_merger;

pub use conversion_verifier::{
    ConversionVerifier, FieldComparison, UnfilledCloud, ValueDifference, VerificationReport,
};
pub use integrity_checker::{
    IntegrityChecker, IntegrityReport, ObservationViolation, StationStatistics, ViolationType,
};
pub use normalizer::{labelled_date_hour, ModernLayout, Normalizer};
pub use parallel_processor::{ParallelProcessor, ProcessOutput};
pub use resampler::{ResampleOutput, ResampleStats, Resampler};
pub use series_merger::SeriesMerger;
