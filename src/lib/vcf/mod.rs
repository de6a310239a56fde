//! Minimal VCF plumbing: header model, streaming reader, variant records, and the
//! final printer.

pub mod header;
pub mod printer;
pub mod reader;
pub mod variant;

pub use header::{CORRECTED_RANK_SCORE, Header, InfoDefinition};
pub use printer::VariantPrinter;
pub use reader::{DataLine, VcfReader};
pub use variant::Variant;
