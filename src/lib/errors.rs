//! Custom error types for compscore operations.

use thiserror::Error;

/// Result type alias for compscore operations
pub type Result<T> = std::result::Result<T, CompscoreError>;

/// Error type for compscore operations
#[derive(Error, Debug)]
pub enum CompscoreError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "VCF")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Malformed header line
    #[error("Malformed header line: {reason}")]
    MalformedHeader {
        /// Explanation of the problem
        reason: String,
    },

    /// A variant line that could not be parsed
    #[error("Malformed variant at line {line_number}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the input stream
        line_number: u64,
        /// Explanation of the problem
        reason: String,
    },

    /// The scoring function rejected a batch
    #[error("Failed to score variant '{variant_id}': {reason}")]
    Scoring {
        /// Identifier of the offending variant
        variant_id: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A queue was used in a way that breaks its acknowledgment protocol
    #[error("Queue protocol violation: {reason}")]
    QueueProtocol {
        /// Explanation of the problem
        reason: String,
    },
}
