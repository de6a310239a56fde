//! Score compound variants in a VCF file.
//!
//! Reads a VCF (file or stdin), groups co-located variants into batches, scores the
//! batches on a pool of workers and writes the variants back in genomic order with a
//! `CorrectedRankScore` INFO field.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use compscore_lib::pipeline::{PipelineConfig, run_pipeline};
use compscore_lib::score::CompoundScorer;
use compscore_lib::validation::is_stdin_path;
use compscore_lib::vcf::VcfReader;

use crate::commands::command::Command;
use crate::commands::common::{PipelineOptions, ScoringOptions, VcfIoOptions};

/// Buffer size for reading the input VCF.
const INPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Score compound variants in a VCF file based on their rank score.
#[derive(Debug, Parser)]
#[command(
    name = "compound",
    about = "\x1b[38;5;72m[SCORING]\x1b[0m        \x1b[36mScore compound variants based on their rank score\x1b[0m",
    long_about = r#"
Score compound variants in a VCF file based on their rank score.

Variants are grouped into batches of co-located variants (same chromosome and
overlapping genes). For every family in the RankScore field, a variant whose
compound partners in the batch all score below --threshold has its score lowered
by --penalty. The result is written to a new CorrectedRankScore INFO field and
the Compounds field is annotated with the partner scores.

Records that cannot be parsed or scored are kept and printed at the end of the
output as lines starting with #FAILED.

EXAMPLES:

  # Score a file and print to stdout
  compscore compound annotated.vcf

  # Read from stdin, write to a file, 8 workers
  cat annotated.vcf | compscore compound - -o scored.vcf -p 8

  # Genes from VEP annotations
  compscore compound vep.vcf --vep -o scored.vcf
"#
)]
pub struct Compound {
    #[command(flatten)]
    pub io: VcfIoOptions,

    #[command(flatten)]
    pub scoring: ScoringOptions,

    #[command(flatten)]
    pub pipeline: PipelineOptions,
}

impl Compound {
    fn open_input(&self) -> Result<Box<dyn BufRead>> {
        if is_stdin_path(&self.io.input) {
            return Ok(Box::new(BufReader::with_capacity(INPUT_BUFFER_SIZE, io::stdin())));
        }
        let file = File::open(&self.io.input)
            .with_context(|| format!("Failed to open {}", self.io.input.display()))?;
        Ok(Box::new(BufReader::with_capacity(INPUT_BUFFER_SIZE, file)))
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .threads(self.pipeline.processes)
            .queue_capacity(self.pipeline.queue_size)
            .vep(self.scoring.vep)
            .temp_dir(self.pipeline.tmp_dir.clone())
            .sort_memory(self.pipeline.max_memory)
    }
}

impl Command for Compound {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        let config = self.pipeline_config();
        config.validate()?;

        info!("Starting Compound");
        info!("Command line: {command_line}");
        info!("Input: {}", self.io.input.display());
        if let Some(outfile) = &self.io.outfile {
            info!("Output: {}", outfile.display());
        }
        info!("Threshold: {}, penalty: {}", self.scoring.threshold, self.scoring.penalty);
        if self.scoring.vep {
            info!("Reading genes from VEP annotations");
        }

        let (reader, header) = VcfReader::new(self.open_input()?)
            .with_context(|| format!("Failed to read header of {}", self.io.input.display()))?;
        info!("Individuals: {}", header.individuals().len());

        let scorer = Arc::new(CompoundScorer::new(self.scoring.threshold, self.scoring.penalty));
        run_pipeline(reader, header, scorer, &config, &self.io.output_options())?;

        info!("Compound completed successfully");
        Ok(())
    }
}
