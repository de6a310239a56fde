//! Restores genomic order and prints the final output.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

use super::scratch::{ScratchRecord, ScratchStore};
use crate::sort::{CoordinateKey, ExternalSorter};
use crate::vcf::{Header, VariantPrinter};

/// Where the final output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Output file; stdout when absent.
    pub outfile: Option<PathBuf>,
    /// Suppress stdout. Ignored when `outfile` is set.
    pub silent: bool,
}

/// Sorts the scratch store, prints the header and every record, then removes the store.
///
/// Returns the number of records printed.
///
/// # Errors
/// Fails if sorting, reading the scratch store, or writing the output fails. The
/// store is removed on success only; on error it is dropped, which also deletes it.
pub fn relinearize(
    scratch: ScratchStore,
    header: &Header,
    options: &OutputOptions,
    sorter: &ExternalSorter,
) -> Result<u64> {
    let stats = sorter
        .sort_in_place::<CoordinateKey>(scratch.path())
        .context("Failed to sort scratch records")?;
    debug!("Scratch store sorted: {} records", stats.output_records);

    let mut printer = VariantPrinter::new(options.outfile.as_deref(), options.silent)?;
    printer.print_header(header).context("Failed to write header")?;

    let mut printed = 0u64;
    for line in scratch.reader()?.lines() {
        let line = line.context("Failed to read scratch record")?;
        let record = ScratchRecord::parse(&line)?;
        printer.print_record(&record).context("Failed to write record")?;
        printed += 1;
    }
    printer.finish().context("Failed to flush output")?;

    scratch.remove();
    Ok(printed)
}
