use thiserror::Error;

use hicmat_core::ContactMatrixError;

use crate::config::BalancerConfigError;

#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("Row {row} has no contacts with any unmasked bin; mask it before balancing")]
    DegenerateRow { row: usize },

    #[error("Non-finite value in {context} at iteration {iteration}")]
    NumericOverflow { iteration: usize, context: String },

    /// The iteration cap was reached. `best` is the scaling vector with the
    /// lowest residual seen (masked bins are NaN), for callers that want to
    /// accept a degraded result explicitly.
    #[error("Balancing did not converge after {iterations} iterations (residual {residual:e})")]
    NonConvergence {
        iterations: usize,
        residual: f64,
        best: Vec<f64>,
    },

    #[error(transparent)]
    Config(#[from] BalancerConfigError),

    #[error(transparent)]
    Matrix(#[from] ContactMatrixError),
}

pub type Result<T> = std::result::Result<T, BalanceError>;
