use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContactMatrixError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    InvalidDimension { expected: usize, found: usize },

    #[error("Bin {index} spans {found} bp, expected a uniform bin size of {expected} bp")]
    InconsistentBinSize {
        index: usize,
        expected: u64,
        found: u64,
    },

    #[error("Invalid merge factor: {0}")]
    InvalidMergeFactor(String),

    #[error("Bin index {index} is out of range for a matrix with {len} bins")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Bin {index} is out of order, overlaps its predecessor, or is empty")]
    UnsortedBins { index: usize },

    #[error("Full storage must be symmetric, but ({row}, {col}) differs from its mirror entry")]
    AsymmetricMatrix { row: usize, col: usize },

    #[error("Invalid contact value {value} at ({row}, {col}): counts must be finite and non-negative")]
    InvalidContact { row: usize, col: usize, value: f64 },
}

pub type Result<T> = std::result::Result<T, ContactMatrixError>;
