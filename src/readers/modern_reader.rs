use crate::error::{ProcessingError, Result};
use crate::models::{RawRow, SourceFormat};
use crate::readers::{decode_text, LineCounter, SourceTable, TextEncoding};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reader for web observation tables saved as CSV.
///
/// The first non-blank row after `skip_lines` is taken as the header. Web
/// tables carry no station column, so the station id is usually injected.
pub struct ModernReader {
    encoding: TextEncoding,
    skip_lines: usize,
    station_id: Option<u32>,
}

impl ModernReader {
    pub fn new() -> Self {
        Self {
            encoding: TextEncoding::Auto,
            skip_lines: 0,
            station_id: None,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Lines of preamble (download notes, station title) before the header.
    pub fn with_skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }

    pub fn with_station_id(mut self, station_id: u32) -> Self {
        self.station_id = Some(station_id);
        self
    }

    pub fn read_table(&self, path: &Path) -> Result<SourceTable> {
        let bytes = fs::read(path)?;
        let text = decode_text(&bytes, self.encoding);
        let (header, rows) = self.parse_text(&text)?;
        debug!("Read {} web table rows from {}", rows.len(), path.display());

        Ok(SourceTable {
            path: path.to_path_buf(),
            format: SourceFormat::ModernWeb,
            header: Some(header),
            rows,
        })
    }

    pub fn parse_text(&self, text: &str) -> Result<(Vec<String>, Vec<RawRow>)> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut lines = LineCounter::new(text);
        let mut header: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line = lines.line_of(&record);
            if line <= self.skip_lines || record.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            let cells: Vec<String> = record.iter().map(str::to_string).collect();
            if header.is_none() {
                header = Some(cells);
                continue;
            }

            let mut row = RawRow::new(line, cells);
            if let Some(station_id) = self.station_id {
                row = row.with_station_id(station_id);
            }
            rows.push(row);
        }

        let header = header
            .ok_or_else(|| ProcessingError::MissingData("web table has no header row".to_string()))?;
        Ok((header, rows))
    }
}

impl Default for ModernReader {
    fn default() -> Self {
        Self::new()
    }
}
