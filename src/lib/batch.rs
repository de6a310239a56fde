//! Grouping of variants into co-located batches.
//!
//! A batch is the unit of work handed to a scorer. Variants land in the same batch
//! when they are on the same chromosome and connected through shared features
//! (genes), so that every compound partner of a variant is scored alongside it.
//!
//! ```text
//!   chr1  GENE_A          ┐
//!   chr1  GENE_A,GENE_B   ├─ batch 0 (features grow to {GENE_A, GENE_B})
//!   chr1  GENE_B          ┘
//!   chr1  (none)          ── batch 1 (intergenic, on its own)
//!   chr2  GENE_A          ── batch 2 (new chromosome)
//! ```

use std::collections::VecDeque;
use std::io::BufRead;

use ahash::AHashSet;
use anyhow::{Result, bail};

use crate::vcf::{Header, Variant, VcfReader};

/// INFO key holding gene annotations written by upstream annotation.
const ANNOTATION_KEY: &str = "Annotation";

/// INFO key holding VEP consequence annotations.
const VEP_KEY: &str = "CSQ";

/// CSQ sub-field carrying the gene symbol.
const VEP_SYMBOL: &str = "SYMBOL";

/// A group of co-located variants, scored as one unit by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: u64,
    chrom: String,
    variants: Vec<Variant>,
}

impl Batch {
    #[must_use]
    pub fn new(index: u64, chrom: String, variants: Vec<Variant>) -> Self {
        Self { index, chrom, variants }
    }

    /// Creation order of the batch.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    #[must_use]
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A record that could not be scored, kept so it still reaches the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    /// 1-based line number in the input.
    pub line_number: u64,
    /// Why the record failed.
    pub reason: String,
    /// The original line.
    pub raw: String,
}

/// Where a variant's features (genes) are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSource {
    /// Comma-separated genes in the `Annotation` INFO field.
    Annotation,
    /// The `SYMBOL` column of every VEP `CSQ` entry.
    Vep { symbol_index: usize },
}

impl FeatureSource {
    /// Picks the feature source, resolving the VEP column from the header.
    ///
    /// # Errors
    /// Fails when `vep` is set but the header does not describe a `CSQ` field with a
    /// `SYMBOL` column.
    pub fn from_header(header: &Header, vep: bool) -> Result<Self> {
        if !vep {
            return Ok(Self::Annotation);
        }
        match header.vep_field_index(VEP_SYMBOL) {
            Some(symbol_index) => Ok(Self::Vep { symbol_index }),
            None => bail!(
                "VEP mode requested but the header has no {VEP_KEY} definition with a {VEP_SYMBOL} column"
            ),
        }
    }

    /// Features of a variant, deduplicated.
    #[must_use]
    pub fn features(&self, variant: &Variant) -> AHashSet<String> {
        let named = |value: &&str| !value.is_empty() && *value != ".";
        match self {
            Self::Annotation => variant
                .info(ANNOTATION_KEY)
                .map(|raw| raw.split(',').filter(named).map(str::to_string).collect())
                .unwrap_or_default(),
            Self::Vep { symbol_index } => variant
                .info(VEP_KEY)
                .map(|raw| {
                    raw.split(',')
                        .filter_map(|entry| entry.split('|').nth(*symbol_index))
                        .filter(named)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// What the builder hands back: a sealed batch or a line that failed to parse.
#[derive(Debug)]
pub enum BatchItem {
    Batch(Batch),
    Failed(FailedRecord),
}

/// Batch under construction.
struct OpenBatch {
    chrom: String,
    features: AHashSet<String>,
    variants: Vec<Variant>,
}

/// Streams a VCF and cuts it into batches.
pub struct BatchBuilder<R> {
    reader: VcfReader<R>,
    source: FeatureSource,
    open: Option<OpenBatch>,
    ready: VecDeque<BatchItem>,
    next_index: u64,
    exhausted: bool,
    regions: Vec<String>,
    seen_regions: AHashSet<String>,
}

impl<R: BufRead> BatchBuilder<R> {
    #[must_use]
    pub fn new(reader: VcfReader<R>, source: FeatureSource) -> Self {
        Self {
            reader,
            source,
            open: None,
            ready: VecDeque::new(),
            next_index: 0,
            exhausted: false,
            regions: Vec::new(),
            seen_regions: AHashSet::new(),
        }
    }

    /// Next batch or failed line; `None` once the input is exhausted.
    ///
    /// # Errors
    /// Propagates read errors from the underlying stream; these are fatal.
    pub fn next_item(&mut self) -> Result<Option<BatchItem>> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.reader.next_data_line()? {
                None => {
                    self.exhausted = true;
                    self.seal_open();
                }
                Some(line) if !line.valid_utf8 => {
                    self.ready.push_back(BatchItem::Failed(FailedRecord {
                        line_number: line.line_number,
                        reason: format!("Line {} is not valid UTF-8", line.line_number),
                        raw: line.text,
                    }));
                }
                Some(line) => match Variant::parse(&line.text, line.line_number) {
                    Ok(variant) => self.place(variant),
                    Err(e) => self.ready.push_back(BatchItem::Failed(FailedRecord {
                        line_number: line.line_number,
                        reason: e.to_string(),
                        raw: line.text,
                    })),
                },
            }
        }
    }

    /// Chromosomes in order of first appearance.
    #[must_use]
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Consumes the builder, returning the region index.
    #[must_use]
    pub fn into_regions(self) -> Vec<String> {
        self.regions
    }

    fn place(&mut self, variant: Variant) {
        if self.seen_regions.insert(variant.chrom().to_string()) {
            self.regions.push(variant.chrom().to_string());
        }

        let features = self.source.features(&variant);
        if let Some(open) = self.open.as_mut() {
            let joins = open.chrom == variant.chrom()
                && !features.is_empty()
                && !open.features.is_disjoint(&features);
            if joins {
                open.features.extend(features);
                open.variants.push(variant);
                return;
            }
            self.seal_open();
        }

        self.open = Some(OpenBatch {
            chrom: variant.chrom().to_string(),
            features,
            variants: vec![variant],
        });
    }

    fn seal_open(&mut self) {
        if let Some(open) = self.open.take() {
            let batch = Batch::new(self.next_index, open.chrom, open.variants);
            self.next_index += 1;
            self.ready.push_back(BatchItem::Batch(batch));
        }
    }
}
