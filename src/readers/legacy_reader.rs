use crate::error::{ProcessingError, Result};
use crate::models::{RawRow, SourceFormat};
use crate::readers::{decode_text, LineCounter, SourceTable, TextEncoding};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reader for header-less archive files (hourly or daily layout).
pub struct LegacyReader {
    use_mmap: bool,
    encoding: TextEncoding,
}

impl LegacyReader {
    pub fn new() -> Self {
        Self {
            use_mmap: false,
            encoding: TextEncoding::Auto,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Read every row of an archive file.
    pub fn read_table(&self, path: &Path, format: SourceFormat) -> Result<SourceTable> {
        if format == SourceFormat::ModernWeb {
            return Err(ProcessingError::InvalidFormat(format!(
                "{} is a web table, not an archive file",
                path.display()
            )));
        }

        let text = if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            decode_text(&mmap, self.encoding)
        } else {
            let mut bytes = Vec::new();
            File::open(path)?.read_to_end(&mut bytes)?;
            decode_text(&bytes, self.encoding)
        };

        let rows = self.parse_rows(&text)?;
        debug!("Read {} archive rows from {}", rows.len(), path.display());

        Ok(SourceTable {
            path: path.to_path_buf(),
            format,
            header: None,
            rows,
        })
    }

    /// Split decoded archive text into rows; blank lines are skipped.
    pub fn parse_rows(&self, text: &str) -> Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut lines = LineCounter::new(text);
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = lines.line_of(&record);
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(RawRow::new(line, record.iter().map(str::to_string).collect()));
        }
        Ok(rows)
    }
}

impl Default for LegacyReader {
    fn default() -> Self {
        Self::new()
    }
}
