//! Feeds batches from the input into the batch queue.

use std::io::BufRead;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use log::{debug, warn};

use super::queue::JoinableQueue;
use super::sink::SinkMessage;
use crate::batch::{Batch, BatchBuilder, BatchItem};

/// What the producer handed out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProducerOutcome {
    /// Batches enqueued.
    pub batches: u64,
    /// Lines that failed to parse and went straight to the sink.
    pub failures: u64,
    /// Chromosomes in order of first appearance.
    pub regions: Vec<String>,
}

/// Drains `builder` into `queue`.
///
/// Malformed lines become failed records on the results queue; the rest of the input
/// is still processed. Shutdown markers are not sent here.
///
/// # Errors
/// Fails on a read error from the input or a closed queue. The outcome counted so
/// far is lost; the caller must still shut the workers down.
pub fn produce_batches<R: BufRead>(
    builder: &mut BatchBuilder<R>,
    queue: &JoinableQueue<Batch>,
    results: &Sender<SinkMessage>,
) -> Result<ProducerOutcome> {
    let mut outcome = ProducerOutcome::default();

    while let Some(item) = builder.next_item().context("Failed to read input variants")? {
        match item {
            BatchItem::Batch(batch) => {
                queue.put(batch).context("Failed to enqueue batch")?;
                outcome.batches += 1;
            }
            BatchItem::Failed(failure) => {
                warn!("Skipping line {}: {}", failure.line_number, failure.reason);
                results
                    .send(SinkMessage::Failed(vec![failure]))
                    .context("Results queue closed while reading input")?;
                outcome.failures += 1;
            }
        }
    }

    outcome.regions = builder.regions().to_vec();
    debug!(
        "Producer finished: {} batches, {} malformed lines, {} regions",
        outcome.batches,
        outcome.failures,
        outcome.regions.len()
    );
    Ok(outcome)
}
