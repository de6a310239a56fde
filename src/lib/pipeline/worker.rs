//! Worker pool: each worker pulls batches, scores them and forwards the result.
//!
//! ```text
//!            get()                 score()               send()
//!   Idle ──────────> Scoring ───────────────> Idle ────────────> results queue
//!     │                  └─ Err / panic ─> Failed records ─┘
//!     └── Shutdown ──> task_done() ──> Exited
//! ```
//!
//! Every dequeued item, work or shutdown marker, is acknowledged exactly once.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use log::{debug, error, warn};

use super::queue::{JoinableQueue, WorkItem};
use super::sink::SinkMessage;
use crate::batch::{Batch, FailedRecord};
use crate::score::BatchScorer;

/// Per-worker counts, returned when the worker exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub batches: u64,
    pub failed_batches: u64,
}

/// Extracts a readable message from a panic payload.
#[must_use]
pub fn extract_panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Starts `count` workers named `scorer-<i>`.
///
/// If a spawn fails, the workers already running are sent one shutdown marker each
/// and joined before the error is returned.
///
/// # Errors
/// Fails if a thread cannot be spawned.
pub fn spawn_workers<S>(
    count: usize,
    queue: &JoinableQueue<Batch>,
    results: &Sender<SinkMessage>,
    scorer: &Arc<S>,
    individuals: &Arc<[String]>,
) -> Result<Vec<JoinHandle<WorkerStats>>>
where
    S: BatchScorer + ?Sized + 'static,
{
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let worker_queue = queue.clone();
        let worker_results = results.clone();
        let worker_scorer = Arc::clone(scorer);
        let worker_individuals = Arc::clone(individuals);

        let spawned = thread::Builder::new().name(format!("scorer-{id}")).spawn(move || {
            run_worker(id, &worker_queue, &worker_results, &*worker_scorer, &worker_individuals)
        });

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                for _ in 0..handles.len() {
                    queue.put_shutdown().context("Failed to stop started workers")?;
                }
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(e).with_context(|| format!("Failed to spawn worker {id}"));
            }
        }
    }
    debug!("Started {count} workers");
    Ok(handles)
}

fn run_worker<S: BatchScorer + ?Sized>(
    id: usize,
    queue: &JoinableQueue<Batch>,
    results: &Sender<SinkMessage>,
    scorer: &S,
    individuals: &[String],
) -> WorkerStats {
    debug!("Worker {id} started");
    let mut stats = WorkerStats::default();

    loop {
        let item = match queue.get() {
            Ok(item) => item,
            Err(e) => {
                error!("Worker {id} lost its queue: {e}");
                break;
            }
        };

        match item {
            WorkItem::Shutdown => {
                acknowledge(queue, id);
                break;
            }
            WorkItem::Work(batch) => {
                let message = score_batch(scorer, &batch, individuals);
                stats.batches += 1;
                if matches!(message, SinkMessage::Failed(_)) {
                    stats.failed_batches += 1;
                }
                if results.send(message).is_err() {
                    warn!("Worker {id}: results queue closed, dropping batch {}", batch.index());
                }
                acknowledge(queue, id);
            }
        }
    }

    debug!("Worker {id} exited after {} batches", stats.batches);
    stats
}

fn acknowledge(queue: &JoinableQueue<Batch>, id: usize) {
    if let Err(e) = queue.task_done() {
        error!("Worker {id}: {e}");
    }
}

/// Scores one batch. Errors and panics turn every variant into a failed record.
fn score_batch<S: BatchScorer + ?Sized>(
    scorer: &S,
    batch: &Batch,
    individuals: &[String],
) -> SinkMessage {
    let reason = match catch_unwind(AssertUnwindSafe(|| scorer.score(batch, individuals))) {
        Ok(Ok(scored)) => return SinkMessage::Scored(scored),
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("Scorer panicked: {}", extract_panic_message(payload.as_ref())),
    };
    warn!("Batch {} on {} failed: {reason}", batch.index(), batch.chrom());

    let failures = batch
        .variants()
        .iter()
        .map(|variant| FailedRecord {
            line_number: variant.line_number(),
            reason: reason.clone(),
            raw: variant.to_line(),
        })
        .collect();
    SinkMessage::Failed(failures)
}
