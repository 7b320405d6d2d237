use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{CanonicalRecord, StationMetadata, StationSeries};
use crate::processors::{
    IntegrityChecker, IntegrityReport, Normalizer, ResampleOutput, Resampler, SeriesMerger,
};
use crate::readers::{ConcurrentReader, InputFile, SourceTable};
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

/// Resampled stations plus the integrity report of their hourly series.
pub struct ProcessOutput {
    pub stations: Vec<ResampleOutput>,
    pub report: IntegrityReport,
}

/// Runs the read → normalize → merge → resample pipeline, one station per
/// rayon task.
pub struct ParallelProcessor {
    max_workers: usize,
    config: PipelineConfig,
    dedupe: bool,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            config: PipelineConfig::default(),
            dedupe: false,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read every input, then normalize, merge and resample.
    pub async fn process_all_data(
        &self,
        reader: &ConcurrentReader,
        inputs: Vec<InputFile>,
        stations: &HashMap<u32, StationMetadata>,
        progress: Option<&ProgressReporter>,
    ) -> Result<ProcessOutput> {
        if let Some(p) = progress {
            p.set_message(&format!("Reading {} files...", inputs.len()));
        }
        let tables = reader.read_all(inputs).await?;

        if let Some(p) = progress {
            p.set_message("Normalizing rows...");
        }
        let records = self.normalize_tables(&tables)?;

        let series = SeriesMerger::with_dedupe(self.dedupe).merge(records, stations)?;

        if let Some(p) = progress {
            p.set_message(&format!("Resampling {} stations...", series.len()));
        }
        let outputs = self.resample_all(&series, progress)?;

        let hourly: Vec<StationSeries> = outputs.iter().map(|o| o.hourly.clone()).collect();
        let report = IntegrityChecker::new().check_integrity(&hourly);

        if let Some(p) = progress {
            p.finish_with_message(&format!("Processed {} stations", outputs.len()));
        }

        Ok(ProcessOutput {
            stations: outputs,
            report,
        })
    }

    /// Normalize tables in parallel; records come back in table order.
    pub fn normalize_tables(&self, tables: &[SourceTable]) -> Result<Vec<CanonicalRecord>> {
        let normalizer = Normalizer::new(self.config.normalizer.clone());
        let pool = self.build_pool()?;

        let per_table: Result<Vec<Vec<CanonicalRecord>>> = pool.install(|| {
            tables
                .par_iter()
                .map(|table| {
                    normalizer.normalize_table(table).map_err(|e| {
                        tracing::error!("Failed to normalize {}: {}", table.path.display(), e);
                        e
                    })
                })
                .collect()
        });

        let records: Vec<CanonicalRecord> = per_table?.into_iter().flatten().collect();
        info!("Normalized {} records from {} tables", records.len(), tables.len());
        Ok(records)
    }

    /// Resample each station series; output order follows input order.
    pub fn resample_all(
        &self,
        series: &[StationSeries],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<ResampleOutput>> {
        let resampler = Resampler::new(self.config.resampler.clone());
        let pool = self.build_pool()?;

        let outputs: Result<Vec<ResampleOutput>> = pool.install(|| {
            series
                .par_iter()
                .map(|station| {
                    let result = resampler.resample(station);
                    if let Some(p) = progress {
                        p.increment(1);
                    }
                    result
                })
                .collect()
        });

        let outputs = outputs?;
        let interpolated: usize = outputs.iter().map(|o| o.stats.interpolated_values).sum();
        info!(
            "Resampled {} stations, {} values interpolated",
            outputs.len(),
            interpolated
        );
        Ok(outputs)
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
