//! Batch scoring.
//!
//! The pipeline only knows the [`BatchScorer`] trait; workers call it once per batch
//! and never look inside. [`CompoundScorer`] is the implementation used by the
//! `compound` command.

pub mod compound;

pub use compound::{CompoundScorer, DEFAULT_PENALTY, DEFAULT_THRESHOLD};

use crate::batch::Batch;
use crate::errors::Result;
use crate::vcf::Variant;

/// The scored variants of one batch, in the order they had in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredBatch {
    /// Index of the batch these variants came from.
    pub index: u64,
    pub variants: Vec<Variant>,
}

/// Scores a whole batch at once.
///
/// Implementations must be pure with respect to the batch: the same batch yields the
/// same result no matter which worker thread runs it.
pub trait BatchScorer: Send + Sync {
    /// # Errors
    /// An error fails every variant of the batch; the pipeline keeps going.
    fn score(&self, batch: &Batch, individuals: &[String]) -> Result<ScoredBatch>;
}
