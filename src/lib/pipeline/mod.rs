//! Concurrent batch-scoring pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  batches   ┌─────────────┐        ┌─────────────┐
//! │ Producer │──────────> │ Batch Queue │──────> │  Worker 0   │──┐
//! │ (caller  │  (bounded, │ (joinable)  │──────> │  Worker 1   │──┤ results
//! │  thread) │  blocking) └─────────────┘──────> │  Worker N-1 │──┤ (unbounded)
//! └────┬─────┘                                   └─────────────┘  │
//!      │ malformed lines                                          v
//!      └──────────────────────────────────────────────────> ┌──────────┐
//!                                                           │   Sink   │──> scratch file
//!                                                           └──────────┘
//! ```
//!
//! # Shutdown
//!
//! 1. The producer enqueues one shutdown marker per worker; the coordinator waits on
//!    [`JoinableQueue::join`] until every batch and every marker was acknowledged,
//!    then joins the worker threads.
//! 2. The coordinator sends exactly one [`SinkMessage::Done`] and joins the sink.
//!
//! Only then is the scratch file sorted and printed (see [`relinearize`]).

pub mod producer;
pub mod queue;
pub mod relinearize;
pub mod scratch;
pub mod sink;
pub mod worker;

pub use producer::{ProducerOutcome, produce_batches};
pub use queue::{JoinableQueue, WorkItem};
pub use relinearize::{OutputOptions, relinearize};
pub use scratch::{ScratchRecord, ScratchStore, ScratchWriter};
pub use sink::{SinkMessage, SinkStats, spawn_sink};
pub use worker::{WorkerStats, extract_panic_message, spawn_workers};

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::{Sender, unbounded};
use log::{debug, info};

use crate::batch::{Batch, BatchBuilder, FeatureSource};
use crate::logging::{OperationTimer, log_pipeline_summary};
use crate::score::BatchScorer;
use crate::sort::{DEFAULT_MEMORY_LIMIT, ExternalSorter};
use crate::validation::validate_positive;
use crate::vcf::{Header, InfoDefinition, VcfReader};

/// Default capacity of the batch queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Upper bound for the default number of workers.
const MAX_DEFAULT_WORKERS: usize = 4;

/// `min(4, available cores)`.
#[must_use]
pub fn default_worker_count() -> usize {
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get).min(MAX_DEFAULT_WORKERS)
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of scoring workers.
    pub threads: usize,
    /// Capacity of the batch queue.
    pub queue_capacity: usize,
    /// Read features from VEP `CSQ` annotations instead of `Annotation`.
    pub vep: bool,
    /// Where the scratch file and sort chunks go.
    pub temp_dir: Option<PathBuf>,
    /// Memory budget of the external sort, in bytes.
    pub sort_memory: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: default_worker_count(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            vep: false,
            temp_dir: None,
            sort_memory: DEFAULT_MEMORY_LIMIT,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn vep(mut self, vep: bool) -> Self {
        self.vep = vep;
        self
    }

    #[must_use]
    pub fn temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    #[must_use]
    pub fn sort_memory(mut self, bytes: usize) -> Self {
        self.sort_memory = bytes;
        self
    }

    /// # Errors
    /// Fails if the worker count, queue capacity or sort memory is zero.
    pub fn validate(&self) -> crate::errors::Result<()> {
        validate_positive(self.threads, "processes")?;
        validate_positive(self.queue_capacity, "queue-size")?;
        validate_positive(self.sort_memory, "max-memory")?;
        Ok(())
    }

    fn sorter(&self) -> ExternalSorter {
        let sorter = ExternalSorter::new().memory_limit(self.sort_memory).threads(self.threads);
        match &self.temp_dir {
            Some(dir) => sorter.temp_dir(dir.clone()),
            None => sorter,
        }
    }
}

/// Counters of a finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    /// Batches handed to workers.
    pub batches: u64,
    /// Batches whose scoring failed or panicked.
    pub failed_batches: u64,
    /// Items acknowledged on the batch queue (batches plus shutdown markers).
    pub acknowledged: u64,
    /// Variants written as scored.
    pub records_scored: u64,
    /// Records written as failures.
    pub records_failed: u64,
    /// Chromosomes in order of first appearance.
    pub regions: Vec<String>,
}

impl PipelineStats {
    /// Records in the scratch store.
    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.records_scored + self.records_failed
    }
}

/// Runs the parallel stage: reads every data line, scores it, and spills the results
/// to a fresh scratch store in arrival order.
///
/// # Errors
/// Fails on an invalid configuration, a missing VEP definition, a scratch store that
/// cannot be created, a read error, or a sink failure. Workers are always shut down
/// before an error from the producer is returned.
pub fn score_to_scratch<R, S>(
    reader: VcfReader<R>,
    header: &Header,
    scorer: Arc<S>,
    config: &PipelineConfig,
) -> Result<(ScratchStore, PipelineStats)>
where
    R: BufRead,
    S: BatchScorer + ?Sized + 'static,
{
    config.validate()?;
    let source = FeatureSource::from_header(header, config.vep)?;
    let scratch = ScratchStore::create(config.temp_dir.as_deref())?;

    debug!("Setting up a batch queue of capacity {}", config.queue_capacity);
    let queue: JoinableQueue<Batch> = JoinableQueue::new(config.queue_capacity)?;
    let (results_tx, results_rx) = unbounded();
    let sink = spawn_sink(results_rx, scratch.writer()?)?;

    info!("Number of scorers: {}", config.threads);
    let individuals: Arc<[String]> = Arc::from(header.individuals());
    let workers = match spawn_workers(config.threads, &queue, &results_tx, &scorer, &individuals) {
        Ok(workers) => workers,
        Err(e) => {
            let _ = results_tx.send(SinkMessage::Done);
            let _ = sink.join();
            return Err(e);
        }
    };

    let mut builder = BatchBuilder::new(reader, source);
    let produced = produce_batches(&mut builder, &queue, &results_tx);

    debug!("Put stop signs in the batch queue");
    for _ in 0..config.threads {
        queue.put_shutdown().context("Failed to enqueue shutdown marker")?;
    }
    queue.join();
    debug!("All {} queue items acknowledged", queue.acknowledged());

    let mut worker_error = None;
    let mut failed_batches = 0;
    for handle in workers {
        match handle.join() {
            Ok(worker_stats) => failed_batches += worker_stats.failed_batches,
            Err(payload) => {
                worker_error = Some(anyhow!(
                    "Worker thread panicked: {}",
                    extract_panic_message(payload.as_ref())
                ));
            }
        }
    }

    let sink_stats = finish_sink(results_tx, sink)?;
    debug!("Sink joined");

    let produced = produced?;
    if let Some(e) = worker_error {
        return Err(e);
    }

    let stats = PipelineStats {
        batches: produced.batches,
        failed_batches,
        acknowledged: queue.acknowledged(),
        records_scored: sink_stats.scored,
        records_failed: sink_stats.failed,
        regions: produced.regions,
    };
    Ok((scratch, stats))
}

/// Sends the single end-of-results marker and joins the sink.
///
/// The sink is joined even when the marker cannot be delivered, so an error that
/// stopped the sink early is the one reported.
fn finish_sink(
    results_tx: Sender<SinkMessage>,
    sink: JoinHandle<Result<SinkStats>>,
) -> Result<SinkStats> {
    let delivered = results_tx.send(SinkMessage::Done).is_ok();
    drop(results_tx);

    let result = match sink.join() {
        Ok(result) => result,
        Err(payload) => {
            Err(anyhow!("Sink thread panicked: {}", extract_panic_message(payload.as_ref())))
        }
    };
    match (result, delivered) {
        (Ok(stats), true) => Ok(stats),
        (Ok(_), false) => bail!("Sink exited before the end of results"),
        (Err(e), true) => Err(e),
        (Err(e), false) => Err(e.context("Sink exited before the end of results")),
    }
}

/// Scores every variant of `reader` and prints the re-linearized result.
///
/// `header` gains the `CorrectedRankScore` definition before any record is processed.
///
/// # Errors
/// See [`score_to_scratch`] and [`relinearize`].
pub fn run_pipeline<R, S>(
    reader: VcfReader<R>,
    mut header: Header,
    scorer: Arc<S>,
    config: &PipelineConfig,
    output: &OutputOptions,
) -> Result<PipelineStats>
where
    R: BufRead,
    S: BatchScorer + ?Sized + 'static,
{
    header.add_info(InfoDefinition::corrected_rank_score());

    let timer = OperationTimer::new("Scoring compound variants");
    let (scratch, stats) = score_to_scratch(reader, &header, scorer, config)?;
    let printed = relinearize(scratch, &header, output, &config.sorter())?;
    timer.log_completion(printed);

    log_pipeline_summary(&stats);
    Ok(stats)
}
