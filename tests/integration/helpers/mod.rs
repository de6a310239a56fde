//! Helper utilities for integration tests.

pub mod assertions;
pub mod vcf_generator;

pub use assertions::*;
pub use vcf_generator::*;
