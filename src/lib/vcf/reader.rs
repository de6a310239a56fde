//! Streaming VCF reader.
//!
//! Reads the header up front and then hands out data lines one at a time. The first
//! data line is consumed while looking for the end of the header, so it is kept
//! aside instead of seeking back; this lets the reader work on standard input.

use std::io::BufRead;

use anyhow::{Context, Result, bail};

use super::header::Header;

/// A data line together with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine {
    pub line_number: u64,
    /// The line text; invalid UTF-8 sequences are replaced with U+FFFD.
    pub text: String,
    /// False when the raw bytes were not valid UTF-8.
    pub valid_utf8: bool,
}

/// Line-oriented VCF reader over any buffered source.
pub struct VcfReader<R> {
    inner: R,
    line_number: u64,
    pending: Option<DataLine>,
    buffer: Vec<u8>,
}

impl<R: BufRead> VcfReader<R> {
    /// Reads the header and returns the reader positioned at the first data line.
    ///
    /// # Errors
    /// Fails on I/O errors, malformed header lines, or a missing `#CHROM` line.
    pub fn new(inner: R) -> Result<(Self, Header)> {
        let mut reader = Self { inner, line_number: 0, pending: None, buffer: Vec::new() };
        let mut header = Header::new();

        while let Some((line, valid_utf8)) = reader.next_raw_line()? {
            if line.starts_with('#') && !valid_utf8 {
                bail!("Header line {} is not valid UTF-8", reader.line_number);
            }
            if line.starts_with("##") {
                header
                    .parse_meta_data(&line)
                    .with_context(|| format!("Bad header at line {}", reader.line_number))?;
            } else if line.starts_with('#') {
                header
                    .parse_header_line(&line)
                    .with_context(|| format!("Bad header at line {}", reader.line_number))?;
            } else {
                reader.pending =
                    Some(DataLine { line_number: reader.line_number, text: line, valid_utf8 });
                break;
            }
        }

        if !header.has_column_line() {
            bail!("Input is missing the #CHROM header line");
        }
        Ok((reader, header))
    }

    /// Returns the next non-empty data line, or `None` at end of input.
    ///
    /// Comment lines after the header are skipped.
    ///
    /// # Errors
    /// Propagates I/O errors from the underlying reader.
    pub fn next_data_line(&mut self) -> Result<Option<DataLine>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        while let Some((text, valid_utf8)) = self.next_raw_line()? {
            if !text.starts_with('#') {
                return Ok(Some(DataLine { line_number: self.line_number, text, valid_utf8 }));
            }
        }
        Ok(None)
    }

    /// Next non-empty line without its line terminator, and whether it was valid UTF-8.
    fn next_raw_line(&mut self) -> Result<Option<(String, bool)>> {
        loop {
            self.buffer.clear();
            let read = self
                .inner
                .read_until(b'\n', &mut self.buffer)
                .with_context(|| format!("Failed to read line {}", self.line_number + 1))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let mut end = self.buffer.len();
            while end > 0 && matches!(self.buffer[end - 1], b'\n' | b'\r') {
                end -= 1;
            }
            if end == 0 {
                continue;
            }

            let bytes = &self.buffer[..end];
            return Ok(Some(match std::str::from_utf8(bytes) {
                Ok(text) => (text.to_string(), true),
                Err(_) => (String::from_utf8_lossy(bytes).into_owned(), false),
            }));
        }
    }
}
