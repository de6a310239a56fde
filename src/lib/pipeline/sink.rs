//! The single consumer of the results queue.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, bail};
use crossbeam_channel::Receiver;
use log::debug;

use super::scratch::ScratchWriter;
use crate::batch::FailedRecord;
use crate::progress::ProgressTracker;
use crate::score::ScoredBatch;

/// A message on the results queue.
#[derive(Debug)]
pub enum SinkMessage {
    /// Variants of a batch that scored cleanly.
    Scored(ScoredBatch),
    /// Records that could not be scored.
    Failed(Vec<FailedRecord>),
    /// No more messages will follow. Sent exactly once.
    Done,
}

/// Counts of records the sink spilled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub scored: u64,
    pub failed: u64,
}

impl SinkStats {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.scored + self.failed
    }
}

/// Starts the sink thread.
///
/// The thread writes every record it receives to `writer`, in arrival order, and
/// returns when it receives [`SinkMessage::Done`].
///
/// # Errors
/// Fails if the thread cannot be spawned.
pub fn spawn_sink(
    rx: Receiver<SinkMessage>,
    writer: ScratchWriter,
) -> Result<JoinHandle<Result<SinkStats>>> {
    thread::Builder::new()
        .name("sink".to_string())
        .spawn(move || drain(&rx, writer))
        .context("Failed to spawn sink thread")
}

fn drain(rx: &Receiver<SinkMessage>, mut writer: ScratchWriter) -> Result<SinkStats> {
    debug!("Sink started");
    let mut stats = SinkStats::default();
    let progress = ProgressTracker::new("Spilled records");

    loop {
        let Ok(message) = rx.recv() else {
            bail!("Results queue closed before the end-of-results marker");
        };
        match message {
            SinkMessage::Scored(batch) => {
                for variant in &batch.variants {
                    writer.write_variant(variant).context("Failed to write scratch record")?;
                }
                let n = batch.variants.len() as u64;
                stats.scored += n;
                progress.record(n);
            }
            SinkMessage::Failed(failures) => {
                for failure in &failures {
                    writer.write_failure(failure).context("Failed to write scratch record")?;
                }
                let n = failures.len() as u64;
                stats.failed += n;
                progress.record(n);
            }
            SinkMessage::Done => break,
        }
    }

    writer.finish().context("Failed to flush scratch file")?;
    progress.log_final();
    debug!("Sink finished: {} scored, {} failed", stats.scored, stats.failed);
    Ok(stats)
}
