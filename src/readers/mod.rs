pub mod concurrent_reader;
pub mod legacy_reader;
pub mod modern_reader;
pub mod station_reader;

pub use concurrent_reader::{ConcurrentReader, InputFile};
pub use legacy_reader::LegacyReader;
pub use modern_reader::ModernReader;
pub use station_reader::StationReader;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::models::{RawRow, SourceFormat};

/// Text encoding of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    /// UTF-8 when the bytes are valid UTF-8, Shift_JIS otherwise.
    #[default]
    Auto,
    Utf8,
    ShiftJis,
}

/// Undecoded rows of one input file.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub path: PathBuf,
    pub format: SourceFormat,
    /// Column labels, for formats that carry a header.
    pub header: Option<Vec<String>>,
    pub rows: Vec<RawRow>,
}

/// Decode file bytes to text, dropping a leading byte-order mark.
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let use_shift_jis = match encoding {
        TextEncoding::Utf8 => false,
        TextEncoding::ShiftJis => true,
        TextEncoding::Auto => std::str::from_utf8(bytes).is_err(),
    };

    if use_shift_jis {
        let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
        if had_errors {
            warn!("Input contained bytes that are not valid Shift_JIS; replaced");
        }
        text.into_owned()
    } else {
        let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
        if had_errors {
            warn!("Input contained bytes that are not valid UTF-8; replaced");
        }
        text.into_owned()
    }
}

/// Physical line numbers of csv records.
///
/// A record's position is where csv started reading, which is before any
/// blank lines it skipped; this counts newlines up to the first byte of the
/// row itself. Records must be passed in reading order.
pub(crate) struct LineCounter<'a> {
    bytes: &'a [u8],
    line: usize,
    counted_to: usize,
}

impl<'a> LineCounter<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            line: 1,
            counted_to: 0,
        }
    }

    pub(crate) fn line_of(&mut self, record: &csv::StringRecord) -> usize {
        let bytes = self.bytes;
        let mut start = record
            .position()
            .map(|p| p.byte() as usize)
            .unwrap_or(self.counted_to)
            .clamp(self.counted_to, bytes.len());
        while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
            start += 1;
        }
        self.line += bytes[self.counted_to..start]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.counted_to = start;
        self.line
    }
}
