use sprs::{CsMat, TriMat};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use hicmat_core::models::{ContactMatrix, Storage};

use crate::errors::{BalanceError, Result};

///
/// The full symmetric contact matrix restricted to the bins that take part
/// in balancing, re-indexed to a compact `0..active.len()` range.
///
pub(crate) struct ActiveSystem {
    matrix: CsMat<f64>,
    /// compact index -> original bin index
    active: Vec<usize>,
    /// rows dropped for having no contacts
    excluded: Vec<usize>,
}

impl ActiveSystem {
    ///
    /// Build the restricted system, skipping masked bins. Empty rows are
    /// either dropped (`exclude_empty_rows`) or reported as degenerate.
    ///
    pub(crate) fn from_matrix(matrix: &ContactMatrix, exclude_empty_rows: bool) -> Result<Self> {
        let n = matrix.len();
        let mut row_sums = vec![0.0; n];
        for (&value, (row, col)) in matrix.csr().iter() {
            if matrix.is_masked(row) || matrix.is_masked(col) {
                continue;
            }
            if !value.is_finite() {
                return Err(BalanceError::NumericOverflow {
                    iteration: 0,
                    context: format!("input contact ({}, {})", row, col),
                });
            }
            row_sums[row] += value;
            if matrix.storage() == Storage::UpperTriangle && row != col {
                row_sums[col] += value;
            }
        }

        let mut excluded = Vec::new();
        let mut active = Vec::with_capacity(n);
        for (index, &sum) in row_sums.iter().enumerate() {
            if matrix.is_masked(index) {
                continue;
            }
            if sum > 0.0 {
                active.push(index);
            } else if exclude_empty_rows {
                excluded.push(index);
            } else {
                return Err(BalanceError::DegenerateRow { row: index });
            }
        }

        let mut lookup: Vec<Option<usize>> = vec![None; n];
        for (compact, &index) in active.iter().enumerate() {
            lookup[index] = Some(compact);
        }

        let size = active.len();
        let mut tri = TriMat::with_capacity((size, size), 2 * matrix.nnz());
        for (&value, (row, col)) in matrix.csr().iter() {
            if let (Some(r), Some(c)) = (lookup[row], lookup[col]) {
                tri.add_triplet(r, c, value);
                if matrix.storage() == Storage::UpperTriangle && r != c {
                    tri.add_triplet(c, r, value);
                }
            }
        }

        Ok(ActiveSystem {
            matrix: tri.to_csr(),
            active,
            excluded,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn active(&self) -> &[usize] {
        &self.active
    }

    pub(crate) fn excluded(&self) -> &[usize] {
        &self.excluded
    }

    /// Sum of every entry of the restricted matrix.
    pub(crate) fn total(&self) -> f64 {
        self.matrix.data().iter().sum()
    }

    fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        self.matrix
            .outer_view(row)
            .map(|view| view.iter().map(|(col, &value)| value * x[col]).sum())
            .unwrap_or(0.0)
    }

    ///
    /// Sparse matrix-vector product `A · x`. Each row is accumulated in column
    /// order, so the serial and parallel paths give identical results.
    ///
    #[cfg(feature = "parallel")]
    pub(crate) fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.len())
            .into_par_iter()
            .map(|row| self.row_dot(row, x))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    pub(crate) fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.len()).map(|row| self.row_dot(row, x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hicmat_core::models::Bin;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn matrix() -> ContactMatrix {
        let bins = (0..4u64).map(|i| Bin::new("chr1", i * 10, i * 10 + 10)).collect();
        let mut tri = TriMat::new((4, 4));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(0, 2, 2.0);
        tri.add_triplet(2, 3, 3.0);
        tri.add_triplet(3, 3, 4.0);
        ContactMatrix::new(tri.to_csr(), bins, Storage::UpperTriangle).unwrap()
    }

    #[rstest]
    fn test_degenerate_row_reported() {
        let result = ActiveSystem::from_matrix(&matrix(), false);
        assert!(matches!(result, Err(BalanceError::DegenerateRow { row: 1 })));
    }

    #[rstest]
    fn test_restricted_product() {
        let system = ActiveSystem::from_matrix(&matrix(), true).unwrap();
        assert_eq!(system.active(), &[0, 2, 3]);
        assert_eq!(system.excluded(), &[1]);
        assert_eq!(system.mul_vec(&[1.0, 1.0, 1.0]), vec![3.0, 5.0, 7.0]);
        assert_eq!(system.total(), 15.0);
    }

    #[rstest]
    fn test_masked_bins_skipped() {
        let m = matrix().with_nan_bins([1, 3]).unwrap();
        let system = ActiveSystem::from_matrix(&m, false).unwrap();
        assert_eq!(system.active(), &[0, 2]);
        assert_eq!(system.mul_vec(&[1.0, 2.0]), vec![5.0, 2.0]);
    }
}
