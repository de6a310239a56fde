//! Output of the final, re-linearized VCF.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::header::Header;
use crate::pipeline::scratch::ScratchRecord;

/// Prefix of the line emitted for a record that could not be scored.
pub const FAILED_PREFIX: &str = "#FAILED";

/// Writes the header and records to a file, to stdout, or nowhere.
///
/// An output path always wins; without one, `silent` suppresses stdout.
pub struct VariantPrinter {
    out: Option<Box<dyn Write>>,
}

impl VariantPrinter {
    /// # Errors
    /// Fails if the output file cannot be created.
    pub fn new(outfile: Option<&Path>, silent: bool) -> Result<Self> {
        let out: Option<Box<dyn Write>> = match outfile {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file {}", path.display()))?;
                Some(Box::new(BufWriter::new(file)))
            }
            None if silent => None,
            None => Some(Box::new(BufWriter::new(io::stdout()))),
        };
        Ok(Self { out })
    }

    /// # Errors
    /// Propagates I/O errors.
    pub fn print_header(&mut self, header: &Header) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => header.write_to(out.as_mut()),
            None => Ok(()),
        }
    }

    /// Prints one sorted scratch record.
    ///
    /// # Errors
    /// Propagates I/O errors.
    pub fn print_record(&mut self, record: &ScratchRecord) -> io::Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        match record {
            ScratchRecord::Variant { line, .. } => writeln!(out, "{line}"),
            ScratchRecord::Failure { line_number, reason, raw } => {
                writeln!(out, "{FAILED_PREFIX}\t{line_number}\t{reason}\t{raw}")
            }
        }
    }

    /// Flushes buffered output.
    ///
    /// # Errors
    /// Propagates I/O errors.
    pub fn finish(mut self) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}
