use crate::error::{ProcessingError, Result};
use crate::models::SourceFormat;
use crate::readers::{LegacyReader, ModernReader, SourceTable, TextEncoding};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::info;

/// One file named on the command line.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    pub format: SourceFormat,
    /// Station for web tables, which carry none.
    pub station_id: Option<u32>,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
            station_id: None,
        }
    }

    pub fn with_station_id(mut self, station_id: Option<u32>) -> Self {
        self.station_id = station_id;
        self
    }
}

/// Reads input files on blocking tasks, at most `max_workers` at a time.
pub struct ConcurrentReader {
    max_workers: usize,
    encoding: TextEncoding,
    use_mmap: bool,
    skip_lines: usize,
}

impl ConcurrentReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            encoding: TextEncoding::Auto,
            use_mmap: false,
            skip_lines: 0,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }

    /// Read all files; tables come back in input order.
    pub async fn read_all(&self, inputs: Vec<InputFile>) -> Result<Vec<SourceTable>> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut handles: Vec<JoinHandle<Result<SourceTable>>> = Vec::with_capacity(inputs.len());

        for input in inputs {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ProcessingError::Config(format!("reader pool closed: {}", e)))?;
            let encoding = self.encoding;
            let use_mmap = self.use_mmap;
            let skip_lines = self.skip_lines;

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                Self::read_one(&input, encoding, use_mmap, skip_lines)
            }));
        }

        let mut tables = Vec::with_capacity(handles.len());
        for handle in handles {
            tables.push(handle.await??);
        }

        let rows: usize = tables.iter().map(|t| t.rows.len()).sum();
        info!("Read {} rows from {} files", rows, tables.len());
        Ok(tables)
    }

    fn read_one(
        input: &InputFile,
        encoding: TextEncoding,
        use_mmap: bool,
        skip_lines: usize,
    ) -> Result<SourceTable> {
        match input.format {
            SourceFormat::ModernWeb => {
                let mut reader = ModernReader::new()
                    .with_encoding(encoding)
                    .with_skip_lines(skip_lines);
                if let Some(station_id) = input.station_id {
                    reader = reader.with_station_id(station_id);
                }
                reader.read_table(&input.path)
            }
            format => LegacyReader::new()
                .with_encoding(encoding)
                .with_mmap(use_mmap)
                .read_table(&input.path, format),
        }
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
