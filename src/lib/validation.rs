//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths with
//! consistent error messages. All functions return [`crate::errors::CompscoreError`].

use crate::errors::{CompscoreError, Result};
use std::path::Path;

/// Returns true if the path denotes standard input (`-` or `/dev/stdin`).
///
/// # Example
/// ```
/// use compscore_lib::validation::is_stdin_path;
///
/// assert!(is_stdin_path("-"));
/// assert!(!is_stdin_path("input.vcf"));
/// ```
pub fn is_stdin_path<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path == Path::new("-") || path == Path::new("/dev/stdin")
}

/// Validate that a file exists
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use compscore_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.vcf", "Input VCF");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(CompscoreError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a count-like parameter is at least one.
///
/// # Errors
/// Returns an error if `value` is zero
///
/// # Example
/// ```
/// use compscore_lib::validation::validate_positive;
///
/// validate_positive(4, "processes").unwrap();
/// assert!(validate_positive(0, "processes").is_err());
/// ```
pub fn validate_positive(value: usize, name: &str) -> Result<()> {
    if value == 0 {
        return Err(CompscoreError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("{name} must be >= 1, got 0"),
        });
    }
    Ok(())
}
