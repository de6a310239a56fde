#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Counters are converted between usize and u64 freely
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # compscore - Compound Variant Scoring Library
//!
//! Corrects the rank scores of VCF variants using the scores of their compound
//! partners. The work is split into batches of co-located variants that are scored
//! in parallel; the results are spilled to disk and put back into genomic order
//! before printing.
//!
//! ## Overview
//!
//! ### Core Functionality
//!
//! - **[`pipeline`]** - Joinable batch queue, worker pool, sink, scratch store and
//!   the two-phase shutdown that ties them together
//! - **[`batch`]** - Grouping of variants into batches by chromosome and shared genes
//! - **[`score`]** - The [`score::BatchScorer`] seam and the compound scorer
//! - **[`sort`]** - External merge-sort of the scratch store
//!
//! ### Utilities
//!
//! - **[`vcf`]** - Header model, streaming reader, variant records and printer
//! - **[`validation`]** - Input validation utilities for parameters and files
//! - **[`progress`]** - Progress tracking and logging
//! - **[`logging`]** - Enhanced logging utilities with formatting
//! - **[`errors`]** - Typed library errors
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use std::sync::Arc;
//!
//! use compscore_lib::pipeline::{OutputOptions, PipelineConfig, run_pipeline};
//! use compscore_lib::score::CompoundScorer;
//! use compscore_lib::vcf::VcfReader;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (reader, header) = VcfReader::new(BufReader::new(File::open("input.vcf")?))?;
//! let config = PipelineConfig::new().threads(4);
//! let output = OutputOptions { outfile: Some("scored.vcf".into()), silent: false };
//! let stats = run_pipeline(reader, header, Arc::new(CompoundScorer::default()), &config, &output)?;
//! println!("{} records scored", stats.records_scored);
//! # Ok(())
//! # }
//! ```
//!
//! ### Progress Tracking
//!
//! ```no_run
//! use compscore_lib::progress::ProgressTracker;
//!
//! let tracker = ProgressTracker::new("Processing records").with_interval(100);
//! for _i in 0..1000 {
//!     tracker.record(1);
//! }
//! tracker.log_final();
//! ```

pub mod batch;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod score;
pub mod sort;
pub mod validation;
pub mod vcf;
