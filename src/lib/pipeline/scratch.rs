//! On-disk scratch store for scored records.
//!
//! The sink appends records here in arrival order; the re-linearizer sorts the file
//! in place and streams it to the final output. One record per line:
//!
//! ```text
//! V <TAB> chrom <TAB> pos <TAB> vcf line
//! F <TAB> line number <TAB> reason <TAB> raw input line
//! ```
//!
//! The chromosome and position are repeated in front of scored lines so the sort key
//! can be read without parsing the VCF record.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::batch::FailedRecord;
use crate::vcf::Variant;

const VARIANT_TAG: &str = "V";
const FAILURE_TAG: &str = "F";

/// Buffer size for scratch reads and writes.
const SCRATCH_BUFFER_SIZE: usize = 64 * 1024;

/// An ephemeral file that lives for one pipeline run.
#[derive(Debug)]
pub struct ScratchStore {
    file: NamedTempFile,
}

impl ScratchStore {
    /// Creates an empty scratch file, inside `temp_dir` if given.
    ///
    /// # Errors
    /// Fails if the directory cannot be created or the file cannot be opened.
    pub fn create(temp_dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("compscore-").suffix(".scratch");
        let file = match temp_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create temp directory {}", dir.display())
                })?;
                builder.tempfile_in(dir)
            }
            None => builder.tempfile(),
        }
        .context("Failed to create scratch file")?;
        debug!("Created scratch file {}", file.path().display());
        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Opens an appending writer. Only the sink holds one.
    ///
    /// # Errors
    /// Fails if the file cannot be opened.
    pub fn writer(&self) -> Result<ScratchWriter> {
        let file = OpenOptions::new()
            .append(true)
            .open(self.path())
            .with_context(|| format!("Failed to open scratch file {}", self.path().display()))?;
        Ok(ScratchWriter { out: BufWriter::with_capacity(SCRATCH_BUFFER_SIZE, file), records: 0 })
    }

    /// Opens a buffered reader from the start of the file.
    ///
    /// # Errors
    /// Fails if the file cannot be opened.
    pub fn reader(&self) -> Result<BufReader<File>> {
        let file = File::open(self.path())
            .with_context(|| format!("Failed to open scratch file {}", self.path().display()))?;
        Ok(BufReader::with_capacity(SCRATCH_BUFFER_SIZE, file))
    }

    /// Deletes the file. A failure is logged, never returned.
    pub fn remove(self) {
        let path = self.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("Removed scratch file {}", path.display()),
            Err(e) => warn!("Failed to remove scratch file {}: {e}", path.display()),
        }
    }
}

/// Appends encoded records to the scratch file.
pub struct ScratchWriter {
    out: BufWriter<File>,
    records: u64,
}

impl ScratchWriter {
    /// Writer that hands every record straight to `file`, so write errors surface
    /// immediately.
    #[cfg(test)]
    pub(crate) fn unbuffered(file: File) -> Self {
        Self { out: BufWriter::with_capacity(0, file), records: 0 }
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn write_variant(&mut self, variant: &Variant) -> io::Result<()> {
        writeln!(
            self.out,
            "{VARIANT_TAG}\t{}\t{}\t{}",
            variant.chrom(),
            variant.pos(),
            variant.to_line()
        )?;
        self.records += 1;
        Ok(())
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn write_failure(&mut self, failure: &FailedRecord) -> io::Result<()> {
        writeln!(
            self.out,
            "{FAILURE_TAG}\t{}\t{}\t{}",
            failure.line_number,
            sanitize(&failure.reason),
            failure.raw
        )?;
        self.records += 1;
        Ok(())
    }

    /// Flushes and closes the writer, returning the number of records written.
    ///
    /// # Errors
    /// Propagates I/O errors from the final flush.
    pub fn finish(mut self) -> io::Result<u64> {
        self.out.flush()?;
        Ok(self.records)
    }
}

/// Failure reasons are free text; keep them on one field.
fn sanitize(reason: &str) -> String {
    reason.replace(['\t', '\n', '\r'], " ")
}

/// A decoded scratch line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScratchRecord {
    Variant { chrom: String, pos: u64, line: String },
    Failure { line_number: u64, reason: String, raw: String },
}

impl ScratchRecord {
    /// Decodes one scratch line (without its trailing newline).
    ///
    /// # Errors
    /// Fails on an unknown tag, missing fields, or a non-numeric position.
    pub fn parse(line: &str) -> Result<Self> {
        let mut fields = line.splitn(4, '\t');
        let (Some(tag), Some(first), Some(second), Some(rest)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            bail!("Truncated scratch record: {line}");
        };

        match tag {
            VARIANT_TAG => Ok(Self::Variant {
                chrom: first.to_string(),
                pos: second
                    .parse()
                    .with_context(|| format!("Bad position in scratch record: {line}"))?,
                line: rest.to_string(),
            }),
            FAILURE_TAG => Ok(Self::Failure {
                line_number: first
                    .parse()
                    .with_context(|| format!("Bad line number in scratch record: {line}"))?,
                reason: second.to_string(),
                raw: rest.to_string(),
            }),
            other => bail!("Unknown scratch record tag '{other}'"),
        }
    }
}
