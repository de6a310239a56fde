//! Concurrency tests for the batch-scoring pipeline.
//!
//! The parallel stage finishes batches in scheduler order; these tests check that the
//! termination protocol never loses or duplicates work and that the final output does
//! not depend on the number of workers.

use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use compscore_lib::batch::Batch;
use compscore_lib::errors::{CompscoreError, Result as ScoreResult};
use compscore_lib::pipeline::{
    OutputOptions, PipelineConfig, PipelineStats, run_pipeline, score_to_scratch,
};
use compscore_lib::score::{BatchScorer, CompoundScorer, ScoredBatch};
use compscore_lib::vcf::VcfReader;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::{
    SyntheticVcf, assert_coordinate_sorted, assert_failures_last, data_lines, failed_lines,
};

fn reader_for(text: String) -> (VcfReader<Cursor<String>>, compscore_lib::vcf::Header) {
    VcfReader::new(Cursor::new(text)).expect("Failed to read header")
}

/// Runs the full pipeline and returns the output text.
fn run_to_string<S>(vcf: &SyntheticVcf, scorer: Arc<S>, config: &PipelineConfig, dir: &Path) -> (String, PipelineStats)
where
    S: BatchScorer + ?Sized + 'static,
{
    let outfile = dir.join(format!("out_{}.vcf", config.threads));
    let (reader, header) = reader_for(vcf.render());
    let output = OutputOptions { outfile: Some(outfile.clone()), silent: true };
    let stats = run_pipeline(reader, header, scorer, config, &output).expect("Pipeline failed");
    (std::fs::read_to_string(outfile).expect("Failed to read output"), stats)
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
#[case(8)]
fn test_scratch_holds_every_record(#[case] threads: usize) {
    let vcf = SyntheticVcf::new(2_000).malformed_every(97);
    let (reader, header) = reader_for(vcf.render());
    let config = PipelineConfig::new().threads(threads).queue_capacity(4);

    let (scratch, stats) =
        score_to_scratch(reader, &header, Arc::new(CompoundScorer::default()), &config).unwrap();

    let lines = BufReader::new(std::fs::File::open(scratch.path()).unwrap()).lines().count();
    assert_eq!(lines, 2_000);
    assert_eq!(stats.total_records(), 2_000);
    assert_eq!(stats.records_failed, 2_000 / 97);
    assert_eq!(stats.acknowledged, stats.batches + threads as u64);
    assert_eq!(stats.regions, vec!["1", "2", "X"]);
    scratch.remove();
}

#[test]
fn test_output_is_identical_for_one_and_four_workers() {
    let dir = TempDir::new().unwrap();
    let vcf = SyntheticVcf::new(1_000).malformed_every(50);
    let scorer = Arc::new(CompoundScorer::default());

    let (one, _) = run_to_string(&vcf, Arc::clone(&scorer), &PipelineConfig::new().threads(1), dir.path());
    let (four, _) = run_to_string(&vcf, scorer, &PipelineConfig::new().threads(4), dir.path());
    assert_eq!(one, four);
}

#[test]
fn test_output_is_identical_for_one_and_eight_workers_on_ten_thousand_records() {
    let dir = TempDir::new().unwrap();
    let vcf = SyntheticVcf::new(10_000);
    let scorer = Arc::new(CompoundScorer::default());

    let (one, one_stats) =
        run_to_string(&vcf, Arc::clone(&scorer), &PipelineConfig::new().threads(1), dir.path());
    let config = PipelineConfig::new().threads(8).queue_capacity(8).sort_memory(64 * 1024);
    let (eight, eight_stats) = run_to_string(&vcf, scorer, &config, dir.path());

    assert_eq!(one, eight);
    assert_eq!(one_stats.records_scored, 10_000);
    assert_eq!(one_stats.batches, eight_stats.batches);

    let data = data_lines(&one);
    assert_eq!(data.len(), 10_000);
    assert_coordinate_sorted(&data);
}

#[test]
fn test_output_is_sorted_with_failures_last() {
    let dir = TempDir::new().unwrap();
    let vcf = SyntheticVcf::new(500).chromosomes(&["chr2", "chr10", "chrX", "chr1"]).malformed_every(40);
    let (text, stats) =
        run_to_string(&vcf, Arc::new(CompoundScorer::default()), &PipelineConfig::new().threads(3), dir.path());

    let data = data_lines(&text);
    assert_coordinate_sorted(&data);
    assert_failures_last(&text);
    assert_eq!(failed_lines(&text).len() as u64, stats.records_failed);
    assert_eq!(data.len() as u64, stats.records_scored);
    assert!(data[0].starts_with("chr1\t"));
}

/// Fails or panics on every other batch.
struct UnreliableScorer;

impl BatchScorer for UnreliableScorer {
    fn score(&self, batch: &Batch, _individuals: &[String]) -> ScoreResult<ScoredBatch> {
        match batch.index() % 4 {
            0 => panic!("batch {} exploded", batch.index()),
            2 => Err(CompscoreError::Scoring {
                variant_id: batch.variants()[0].variant_id(),
                reason: "refused".to_string(),
            }),
            _ => Ok(ScoredBatch { index: batch.index(), variants: batch.variants().to_vec() }),
        }
    }
}

#[test]
fn test_scoring_failures_do_not_lose_records() {
    let dir = TempDir::new().unwrap();
    let vcf = SyntheticVcf::new(300);
    let scorer: Arc<dyn BatchScorer> = Arc::new(UnreliableScorer);
    let (text, stats) = run_to_string(&vcf, scorer, &PipelineConfig::new().threads(4), dir.path());

    assert!(stats.records_failed > 0);
    assert!(stats.failed_batches > 0);
    assert!(stats.failed_batches < stats.batches);
    assert_eq!(stats.total_records(), 300);
    assert_eq!(data_lines(&text).len() + failed_lines(&text).len(), 300);
    assert_failures_last(&text);
}

#[test]
fn test_backpressure_with_tiny_queue() {
    let vcf = SyntheticVcf::new(3_000);
    let (reader, header) = reader_for(vcf.render());
    let config = PipelineConfig::new().threads(8).queue_capacity(1);
    let (scratch, stats) =
        score_to_scratch(reader, &header, Arc::new(CompoundScorer::default()), &config).unwrap();
    assert_eq!(stats.total_records(), 3_000);
    scratch.remove();
}

/// Serves `limit` bytes of `inner`, then fails every read.
struct FailingRead {
    inner: Cursor<Vec<u8>>,
    limit: u64,
}

impl Read for FailingRead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.inner.position() >= self.limit {
            return Err(io::Error::other("device went away"));
        }
        let remaining = (self.limit - self.inner.position()) as usize;
        let n = buf.len().min(remaining);
        self.inner.read(&mut buf[..n])
    }
}

#[test]
fn test_read_error_shuts_down_cleanly() {
    let vcf = SyntheticVcf::new(1_000);
    let text = vcf.render();
    let limit = (vcf.header().len() + 20_000) as u64;
    let source = FailingRead { inner: Cursor::new(text.into_bytes()), limit };
    let (reader, header) = VcfReader::new(BufReader::with_capacity(512, source)).unwrap();

    let config = PipelineConfig::new().threads(4).queue_capacity(2);
    let err = score_to_scratch(reader, &header, Arc::new(CompoundScorer::default()), &config)
        .expect_err("read error must be fatal");
    assert!(format!("{err:#}").contains("device went away"));
}

#[test]
fn test_genotype_mismatch_fails_whole_batches() {
    let dir = TempDir::new().unwrap();
    let vcf = SyntheticVcf::new(40);
    let (reader, _) = reader_for(vcf.render());
    let (_, header) = reader_for(SyntheticVcf::new(0).samples(&["only_one"]).header());

    let outfile = dir.path().join("out.vcf");
    let output = OutputOptions { outfile: Some(outfile.clone()), silent: true };
    let stats = run_pipeline(
        reader,
        header,
        Arc::new(CompoundScorer::default()),
        &PipelineConfig::new().threads(2),
        &output,
    )
    .unwrap();

    assert_eq!(stats.records_scored, 0);
    assert_eq!(stats.records_failed, 40);
    assert_eq!(stats.failed_batches, stats.batches);
    let text = std::fs::read_to_string(outfile).unwrap();
    assert!(failed_lines(&text)[0].contains("genotype columns"));
}

#[test]
fn test_non_utf8_record_fails_alone() {
    let dir = TempDir::new().unwrap();
    let vcf = SyntheticVcf::new(10);
    let mut bytes = vcf.header().into_bytes();
    for i in 0..10 {
        bytes.extend_from_slice(vcf.record_line(i).as_bytes());
        bytes.push(b'\n');
        if i == 4 {
            bytes.extend_from_slice(b"2\t999\t.\tA\tG\t.\t.\tNOTE=\xff\xfe\n");
        }
    }
    let (reader, header) = VcfReader::new(Cursor::new(bytes)).unwrap();

    let outfile = dir.path().join("out.vcf");
    let output = OutputOptions { outfile: Some(outfile.clone()), silent: true };
    let stats = run_pipeline(
        reader,
        header,
        Arc::new(CompoundScorer::default()),
        &PipelineConfig::new().threads(3),
        &output,
    )
    .unwrap();

    assert_eq!(stats.records_scored, 10);
    assert_eq!(stats.records_failed, 1);
    let text = std::fs::read_to_string(outfile).unwrap();
    assert_eq!(data_lines(&text).len(), 10);
    let failures = failed_lines(&text);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("not valid UTF-8"), "{}", failures[0]);
}
