//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use clap::Args;

use compscore_lib::pipeline::{DEFAULT_QUEUE_CAPACITY, OutputOptions, default_worker_count};
use compscore_lib::score::{DEFAULT_PENALTY, DEFAULT_THRESHOLD};
use compscore_lib::validation::{is_stdin_path, validate_file_exists};

/// Input VCF and where the scored records go.
#[derive(Debug, Clone, Args)]
pub struct VcfIoOptions {
    /// Input VCF file, or `-` for standard input.
    #[arg(value_name = "VCF_FILE")]
    pub input: PathBuf,

    /// Specify the path to a file where results should be stored.
    #[arg(short = 'o', long = "outfile")]
    pub outfile: Option<PathBuf>,

    /// Do not print the variants.
    #[arg(short = 's', long = "silent")]
    pub silent: bool,
}

impl VcfIoOptions {
    /// Validates that the input file exists (skipped for stdin paths).
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_stdin_path(&self.input) {
            validate_file_exists(&self.input, "Input VCF")?;
        }
        Ok(())
    }

    #[must_use]
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions { outfile: self.outfile.clone(), silent: self.silent }
    }
}

/// Knobs of the compound scorer.
#[derive(Debug, Clone, Args)]
pub struct ScoringOptions {
    /// Partner rank score a compound needs to leave the variant's score untouched.
    #[arg(long = "threshold", default_value_t = DEFAULT_THRESHOLD, allow_negative_numbers = true)]
    pub threshold: i64,

    /// Amount subtracted from the rank score when no partner reaches the threshold.
    #[arg(long = "penalty", default_value_t = DEFAULT_PENALTY, allow_negative_numbers = true)]
    pub penalty: i64,

    /// If variants are annotated with the Variant Effect Predictor.
    #[arg(long = "vep")]
    pub vep: bool,
}

/// Parallelism and resource options.
#[derive(Debug, Clone, Args)]
pub struct PipelineOptions {
    /// Number of scoring workers.
    #[arg(short = 'p', long = "processes", default_value_t = default_worker_count())]
    pub processes: usize,

    /// Maximum number of batches waiting for a worker.
    #[arg(long = "queue-size", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_size: usize,

    /// Temporary directory for the scratch file and sort chunks.
    ///
    /// If not specified, uses the system default temp directory.
    #[arg(short = 'T', long = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,

    /// Maximum memory for sorting the scored records before printing.
    ///
    /// Accepts values like "512M", "1G". When the limit is reached, sorted
    /// chunks are written to temporary files and merged at the end.
    #[arg(short = 'm', long = "max-memory", default_value = "512M", value_parser = parse_memory)]
    pub max_memory: usize,
}

/// Parse memory size string (e.g., "512M", "1G", "2G").
pub fn parse_memory(s: &str) -> Result<usize, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty memory specification".to_string());
    }

    let (num_str, multiplier) = if let Some(num) = s.strip_suffix('G') {
        (num, 1024 * 1024 * 1024)
    } else if let Some(num) = s.strip_suffix('M') {
        (num, 1024 * 1024)
    } else if let Some(num) = s.strip_suffix('K') {
        (num, 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {num_str}"))?;
    if !num.is_finite() || num <= 0.0 {
        return Err("Memory size must be positive".to_string());
    }

    Ok((num * f64::from(multiplier)) as usize)
}
