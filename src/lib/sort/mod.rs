//! Sorting of the scratch store.
//!
//! Workers finish batches in whatever order the scheduler allows, so the scratch
//! store is unordered. This module restores genomic order before printing.
//!
//! # Architecture
//!
//! 1. **Read phase**: Stream scratch lines, extract a [`SortKey`] per line
//! 2. **Accumulate phase**: Buffer lines until the memory limit is reached
//! 3. **Sort phase**: Parallel sort of in-memory lines using rayon
//! 4. **Spill phase**: Write the sorted chunk to a temp file
//! 5. **Merge phase**: K-way merge of sorted temp files using a min-heap

pub mod external;
pub mod keys;

pub use external::{DEFAULT_MEMORY_LIMIT, ExternalSorter, SortStats};
pub use keys::{ChromosomeOrder, CoordinateKey, SortKey};
