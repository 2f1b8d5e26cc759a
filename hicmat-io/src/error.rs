use std::io;
use thiserror::Error;

use hicmat_core::ContactMatrixError;

/// Error type for hicmat-io operations.
#[derive(Error, Debug)]
pub enum MatrixIoError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A line of an input file could not be parsed.
    #[error("Failed to parse {path} line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    /// The format cannot perform the requested operation.
    #[error("Unsupported operation for format: {0}")]
    UnsupportedFormat(String),

    /// The format needs a bed file of bins and none was given.
    #[error("The {0} format requires a bed file describing the bins")]
    MissingBedFile(String),

    /// The loaded data does not form a valid contact matrix.
    #[error(transparent)]
    Matrix(#[from] ContactMatrixError),
}

/// Result type alias for hicmat-io operations.
pub type Result<T> = std::result::Result<T, MatrixIoError>;
