//! Sort keys for scratch records.
//!
//! # Key Types
//!
//! - [`ChromosomeOrder`]: karyotypic chromosome order, `chr` prefix ignored
//! - [`CoordinateKey`]: chromosome then position; failed records after every variant,
//!   by input line number

use anyhow::Result;

use crate::pipeline::scratch::ScratchRecord;

/// A key extracted from one line of a line-oriented file.
///
/// The external sorter breaks ties between equal keys on the full line, so the final
/// order is total even when keys collide.
pub trait SortKey: Ord + Send + Sized {
    /// # Errors
    /// Fails if the line cannot be decoded.
    fn from_line(line: &str) -> Result<Self>;
}

/// Chromosome rank: 1..22 (any number) numerically, then X, Y, mitochondrial, then
/// every other name lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChromosomeOrder {
    Numeric(u32),
    X,
    Y,
    Mitochondrial,
    Other(String),
}

impl ChromosomeOrder {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let bare = ["chr", "Chr", "CHR"]
            .iter()
            .find_map(|prefix| name.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(name);

        if let Ok(n) = bare.parse::<u32>() {
            return Self::Numeric(n);
        }
        match bare {
            "X" | "x" => Self::X,
            "Y" | "y" => Self::Y,
            "M" | "MT" | "m" | "mt" => Self::Mitochondrial,
            _ => Self::Other(bare.to_string()),
        }
    }
}

/// Genomic order for scored variants, with failures collected at the end.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoordinateKey {
    Variant { chrom: ChromosomeOrder, pos: u64 },
    Failure { line_number: u64 },
}

impl SortKey for CoordinateKey {
    fn from_line(line: &str) -> Result<Self> {
        Ok(match ScratchRecord::parse(line)? {
            ScratchRecord::Variant { chrom, pos, .. } => {
                Self::Variant { chrom: ChromosomeOrder::from_name(&chrom), pos }
            }
            ScratchRecord::Failure { line_number, .. } => Self::Failure { line_number },
        })
    }
}
