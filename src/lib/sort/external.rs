//! External merge-sort for line-oriented files.
//!
//! Handles inputs larger than the memory budget by spilling sorted chunks to
//! temporary files.
//!
//! # Algorithm
//!
//! 1. **Accumulate phase**: Read lines and their keys until the memory limit is reached
//! 2. **Sort phase**: Sort the chunk (in parallel with rayon when threads > 1)
//! 3. **Spill phase**: Write the sorted chunk to a file in a private temp directory
//! 4. **Merge phase**: K-way merge of the chunks using a binary heap
//!
//! Equal keys are ordered by the full line, so the output is identical no matter how
//! the input was chunked or in which order equal-keyed lines arrived.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use tempfile::{NamedTempFile, TempDir};

use super::keys::SortKey;

/// Default memory limit per chunk (512 MB).
pub const DEFAULT_MEMORY_LIMIT: usize = 512 * 1024 * 1024;

/// Estimated per-line overhead on top of the line bytes (key, `String` header, `Vec` slot).
const LINE_OVERHEAD: usize = 96;

/// Buffer size for reading and writing chunk files.
const MERGE_BUFFER_SIZE: usize = 64 * 1024;

/// External sorter for text files with one record per line.
#[derive(Debug, Clone)]
pub struct ExternalSorter {
    /// Maximum memory to use for in-memory sorting.
    memory_limit: usize,
    /// Temporary directory for spill files.
    temp_dir: Option<PathBuf>,
    /// Number of threads for the in-memory sort.
    threads: usize,
}

impl Default for ExternalSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalSorter {
    #[must_use]
    pub fn new() -> Self {
        Self { memory_limit: DEFAULT_MEMORY_LIMIT, temp_dir: None, threads: 1 }
    }

    /// Set the memory limit for in-memory sorting.
    #[must_use]
    pub fn memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = limit.max(1);
        self
    }

    /// Set the temporary directory for spill files.
    #[must_use]
    pub fn temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Set the number of threads.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Sorts `input` into `output`.
    ///
    /// # Errors
    /// Fails on I/O errors or when a line cannot be turned into a key.
    pub fn sort<K: SortKey>(&self, input: &Path, output: &Path) -> Result<SortStats> {
        debug!(
            "Sorting {} (memory limit {} MB, {} threads)",
            input.display(),
            self.memory_limit / (1024 * 1024),
            self.threads
        );

        let reader = BufReader::with_capacity(
            MERGE_BUFFER_SIZE,
            File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
        );

        let temp_dir = self.create_temp_dir()?;
        let mut stats = SortStats::default();
        let mut chunk_files: Vec<PathBuf> = Vec::new();
        let mut entries: Vec<(K, String)> = Vec::new();
        let mut memory_used = 0usize;

        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {}", input.display()))?;
            stats.total_records += 1;
            let key = K::from_line(&line)
                .with_context(|| format!("Bad record {} in {}", stats.total_records, input.display()))?;
            memory_used += line.len() + LINE_OVERHEAD;
            entries.push((key, line));

            if memory_used >= self.memory_limit {
                let chunk_path = temp_dir.path().join(format!("chunk_{:04}.txt", chunk_files.len()));
                self.sort_and_write(&mut entries, &chunk_path)?;
                stats.chunks_written += 1;
                chunk_files.push(chunk_path);
                entries.clear();
                memory_used = 0;
            }
        }

        if chunk_files.is_empty() {
            self.sort_and_write(&mut entries, output)?;
        } else {
            if !entries.is_empty() {
                let chunk_path = temp_dir.path().join(format!("chunk_{:04}.txt", chunk_files.len()));
                self.sort_and_write(&mut entries, &chunk_path)?;
                stats.chunks_written += 1;
                chunk_files.push(chunk_path);
            }
            debug!("Merging {} chunks", chunk_files.len());
            stats.output_records = Self::merge_chunks::<K>(&chunk_files, output)?;
        }

        if stats.chunks_written == 0 {
            stats.output_records = stats.total_records;
        }
        info!(
            "Sorted {} records ({} spilled chunks)",
            stats.total_records, stats.chunks_written
        );
        Ok(stats)
    }

    /// Sorts `path` and atomically replaces it with the sorted result.
    ///
    /// # Errors
    /// See [`ExternalSorter::sort`]; also fails if the result cannot be moved into place.
    pub fn sort_in_place<K: SortKey>(&self, path: &Path) -> Result<SortStats> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let sorted = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create sort output in {}", parent.display()))?;
        let stats = self.sort::<K>(path, sorted.path())?;
        sorted
            .persist(path)
            .with_context(|| format!("Failed to replace {} with sorted output", path.display()))?;
        Ok(stats)
    }

    fn sort_and_write<K: SortKey>(&self, entries: &mut [(K, String)], path: &Path) -> Result<()> {
        if self.threads > 1 {
            entries.par_sort_unstable_by(compare_entries);
        } else {
            entries.sort_unstable_by(compare_entries);
        }

        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::with_capacity(MERGE_BUFFER_SIZE, file);
        for (_, line) in entries.iter() {
            writeln!(writer, "{line}")?;
        }
        writer.flush().with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// K-way merge of sorted chunk files. Returns the number of lines written.
    fn merge_chunks<K: SortKey>(chunk_files: &[PathBuf], output: &Path) -> Result<u64> {
        let mut chunk_readers: Vec<ChunkReader<K>> = chunk_files
            .iter()
            .enumerate()
            .map(|(idx, path)| ChunkReader::new(path, idx))
            .collect::<Result<Vec<_>>>()?;

        let mut heap: BinaryHeap<Reverse<HeapEntry<K>>> = BinaryHeap::with_capacity(chunk_files.len());
        for reader in &mut chunk_readers {
            if let Some((key, line)) = reader.next()? {
                heap.push(Reverse(HeapEntry { key, line, chunk_idx: reader.idx }));
            }
        }

        let file = File::create(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let mut writer = BufWriter::with_capacity(MERGE_BUFFER_SIZE, file);
        let mut written = 0u64;

        while let Some(Reverse(entry)) = heap.pop() {
            writeln!(writer, "{}", entry.line)?;
            written += 1;

            let reader = &mut chunk_readers[entry.chunk_idx];
            if let Some((key, line)) = reader.next()? {
                heap.push(Reverse(HeapEntry { key, line, chunk_idx: reader.idx }));
            }
        }

        writer.flush().with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(written)
    }

    /// Create temporary directory for spill files.
    fn create_temp_dir(&self) -> Result<TempDir> {
        match &self.temp_dir {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                TempDir::new_in(base).context("Failed to create temp directory")
            }
            None => TempDir::new().context("Failed to create temp directory"),
        }
    }
}

fn compare_entries<K: Ord>(a: &(K, String), b: &(K, String)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1))
}

/// Reader for a sorted chunk file.
struct ChunkReader<K> {
    lines: std::io::Lines<BufReader<File>>,
    idx: usize,
    _phantom: PhantomData<K>,
}

impl<K: SortKey> ChunkReader<K> {
    fn new(path: &Path, idx: usize) -> Result<Self> {
        let file = File::open(path).context("Failed to open chunk file")?;
        let lines = BufReader::with_capacity(MERGE_BUFFER_SIZE, file).lines();
        Ok(Self { lines, idx, _phantom: PhantomData })
    }

    fn next(&mut self) -> Result<Option<(K, String)>> {
        match self.lines.next() {
            None => Ok(None),
            Some(line) => {
                let line = line.context("Failed to read chunk file")?;
                let key = K::from_line(&line)?;
                Ok(Some((key, line)))
            }
        }
    }
}

/// Entry in the merge heap.
struct HeapEntry<K> {
    key: K,
    line: String,
    chunk_idx: usize,
}

impl<K: Ord> PartialEq for HeapEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord> Eq for HeapEntry<K> {}

impl<K: Ord> PartialOrd for HeapEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for HeapEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.line.cmp(&other.line))
            .then_with(|| self.chunk_idx.cmp(&other.chunk_idx))
    }
}

/// Statistics from a sort operation.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortStats {
    /// Total records read from input.
    pub total_records: u64,
    /// Records written to output.
    pub output_records: u64,
    /// Number of temporary chunk files written.
    pub chunks_written: usize,
}
