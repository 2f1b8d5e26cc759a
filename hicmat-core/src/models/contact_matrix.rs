use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Range;

use sprs::{CsMat, TriMat};

use crate::errors::{ContactMatrixError, Result};
use crate::models::Bin;

/// How the contacts of a [ContactMatrix] are laid out in its sparse storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Storage {
    /// Both triangles are stored, and every entry must equal its mirror.
    Full,
    /// Only entries with `row <= col` are stored; the lower triangle is implied.
    UpperTriangle,
}

///
/// A sparse, symmetric, non-negative Hi-C contact matrix together with the
/// genomic bins that index its rows and columns.
///
/// Masked bins (`nan_bins`) stay part of the matrix so its dimension never
/// changes, but every numeric operation treats them as contributing zero.
///
#[derive(Debug, Clone)]
pub struct ContactMatrix {
    matrix: CsMat<f64>,
    storage: Storage,
    bins: Vec<Bin>,
    nan_bins: BTreeSet<usize>,
    correction_factors: Option<Vec<f64>>,
    distance_counts: Option<BTreeMap<u64, f64>>,
}

impl ContactMatrix {
    ///
    /// Create a new [ContactMatrix] from a sparse matrix and its bins.
    ///
    /// With [Storage::UpperTriangle], any entry stored below the diagonal is
    /// mirrored into the upper triangle (and summed with an existing entry there).
    ///
    /// # Arguments
    /// - matrix: square sparse matrix of contact counts
    /// - bins: one bin per row/column, contiguous and sorted per chromosome
    /// - storage: layout of the stored entries
    pub fn new(matrix: CsMat<f64>, bins: Vec<Bin>, storage: Storage) -> Result<Self> {
        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(ContactMatrixError::InvalidDimension {
                expected: rows,
                found: cols,
            });
        }
        if bins.len() != rows {
            return Err(ContactMatrixError::InvalidDimension {
                expected: rows,
                found: bins.len(),
            });
        }
        validate_bins(&bins)?;

        for (&value, (row, col)) in matrix.iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(ContactMatrixError::InvalidContact { row, col, value });
            }
        }

        let matrix = if !matrix.is_csr() {
            matrix.to_other_storage()
        } else {
            matrix
        };

        if storage == Storage::Full {
            for (&value, (row, col)) in matrix.iter() {
                if matrix.get(col, row) != Some(&value) {
                    return Err(ContactMatrixError::AsymmetricMatrix { row, col });
                }
            }
        }

        let matrix = match storage {
            Storage::UpperTriangle if matrix.iter().any(|(_, (r, c))| r > c) => {
                let mut tri = TriMat::new((rows, cols));
                for (&value, (row, col)) in matrix.iter() {
                    tri.add_triplet(row.min(col), row.max(col), value);
                }
                tri.to_csr()
            }
            _ => matrix,
        };

        Ok(ContactMatrix {
            matrix,
            storage,
            bins,
            nan_bins: BTreeSet::new(),
            correction_factors: None,
            distance_counts: None,
        })
    }

    /// Create a matrix with no contacts over the given bins.
    pub fn empty(bins: Vec<Bin>, storage: Storage) -> Result<Self> {
        let n = bins.len();
        ContactMatrix::new(CsMat::zero((n, n)), bins, storage)
    }

    pub fn with_nan_bins<I: IntoIterator<Item = usize>>(mut self, indices: I) -> Result<Self> {
        self.mask(indices)?;
        Ok(self)
    }

    pub fn with_correction_factors(mut self, factors: Vec<f64>) -> Result<Self> {
        self.set_correction_factors(Some(factors))?;
        Ok(self)
    }

    pub fn with_distance_counts(mut self, distance_counts: BTreeMap<u64, f64>) -> Self {
        self.distance_counts = Some(distance_counts);
        self
    }

    ///
    /// Record (or clear) the per-bin correction factors for this matrix.
    /// This does not rescale any contacts, see [ContactMatrix::apply_correction].
    ///
    pub fn set_correction_factors(&mut self, factors: Option<Vec<f64>>) -> Result<()> {
        if let Some(ref factors) = factors {
            if factors.len() != self.len() {
                return Err(ContactMatrixError::InvalidDimension {
                    expected: self.len(),
                    found: factors.len(),
                });
            }
        }
        self.correction_factors = factors;
        Ok(())
    }

    ///
    /// Mark bins as invalid. Masked bins keep their row and column, but are
    /// excluded from sums, merging and balancing. Masking an already-masked
    /// bin is a no-op. Nothing is masked if any index is out of range.
    ///
    pub fn mask<I: IntoIterator<Item = usize>>(&mut self, indices: I) -> Result<()> {
        let indices: Vec<usize> = indices.into_iter().collect();
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(ContactMatrixError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        self.nan_bins.extend(indices);
        Ok(())
    }

    pub fn is_masked(&self, index: usize) -> bool {
        self.nan_bins.contains(&index)
    }

    /// Number of bins (the dimension N of the N×N matrix).
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    pub fn csr(&self) -> &CsMat<f64> {
        &self.matrix
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn nan_bins(&self) -> &BTreeSet<usize> {
        &self.nan_bins
    }

    pub fn correction_factors(&self) -> Option<&[f64]> {
        self.correction_factors.as_deref()
    }

    pub fn distance_counts(&self) -> Option<&BTreeMap<u64, f64>> {
        self.distance_counts.as_ref()
    }

    ///
    /// Get the contact count between two bins, honoring the symmetric storage.
    ///
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (row, col) = match self.storage {
            Storage::Full => (row, col),
            Storage::UpperTriangle => (row.min(col), row.max(col)),
        };
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }

    ///
    /// Expand the stored contacts into a full symmetric CSR matrix.
    ///
    pub fn to_symmetric(&self) -> CsMat<f64> {
        match self.storage {
            Storage::Full => self.matrix.clone(),
            Storage::UpperTriangle => {
                let mut tri = TriMat::with_capacity(self.matrix.shape(), 2 * self.nnz());
                for (&value, (row, col)) in self.matrix.iter() {
                    tri.add_triplet(row, col, value);
                    if row != col {
                        tri.add_triplet(col, row, value);
                    }
                }
                tri.to_csr()
            }
        }
    }

    ///
    /// Keep only the upper triangle (diagonal included) of the stored contacts.
    ///
    pub fn upper_triangle(&self) -> CsMat<f64> {
        match self.storage {
            Storage::UpperTriangle => self.matrix.clone(),
            Storage::Full => {
                let mut tri = TriMat::new(self.matrix.shape());
                for (&value, (row, col)) in self.matrix.iter() {
                    if row <= col {
                        tri.add_triplet(row, col, value);
                    }
                }
                tri.to_csr()
            }
        }
    }

    /// Iterate the unmasked contacts of the upper triangle as `(row, col, value)`,
    /// each unordered bin pair exactly once.
    pub fn iter_upper(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.matrix
            .iter()
            .filter(|(_, (row, col))| row <= col)
            .filter(|(_, (row, col))| !self.is_masked(*row) && !self.is_masked(*col))
            .map(|(&value, (row, col))| (row, col, value))
    }

    ///
    /// Row sums of the full symmetric matrix. Masked rows and columns
    /// contribute zero.
    ///
    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.len()];
        for (row, col, value) in self.iter_upper() {
            sums[row] += value;
            if row != col {
                sums[col] += value;
            }
        }
        sums
    }

    /// Sum of every entry of the full symmetric matrix, masked bins excluded.
    pub fn total_contacts(&self) -> f64 {
        self.row_sums().iter().sum()
    }

    ///
    /// Unmasked rows that have no contact with any unmasked bin.
    ///
    pub fn empty_rows(&self) -> Vec<usize> {
        self.row_sums()
            .iter()
            .enumerate()
            .filter(|(i, sum)| **sum == 0.0 && !self.is_masked(*i))
            .map(|(i, _)| i)
            .collect()
    }

    /// Mask every empty row, returning the indices that were newly masked.
    pub fn mask_empty_rows(&mut self) -> Vec<usize> {
        let empty = self.empty_rows();
        if !empty.is_empty() {
            log::info!("Masking {} empty rows", empty.len());
        }
        self.nan_bins.extend(empty.iter().copied());
        empty
    }

    ///
    /// The contiguous index range occupied by each chromosome, in matrix order.
    ///
    pub fn chromosome_ranges(&self) -> Vec<(&str, Range<usize>)> {
        let mut ranges: Vec<(&str, Range<usize>)> = Vec::new();
        for (i, bin) in self.bins.iter().enumerate() {
            match ranges.last_mut() {
                Some((chr, range)) if *chr == bin.chr => range.end = i + 1,
                _ => ranges.push((bin.chr.as_str(), i..i + 1)),
            }
        }
        ranges
    }

    ///
    /// Get the uniform genomic span of the bins.
    ///
    /// The last bin of a chromosome is allowed to be shorter than the others,
    /// since chromosome lengths are rarely a multiple of the resolution. Every
    /// other bin must have exactly the same span.
    ///
    pub fn bin_size(&self) -> Result<u64> {
        if self.is_empty() {
            return Err(ContactMatrixError::InvalidDimension {
                expected: 1,
                found: 0,
            });
        }

        let ranges = self.chromosome_ranges();
        let inner = |range: &Range<usize>| range.start..range.end - 1;

        let inner_width = ranges
            .iter()
            .flat_map(|(_, range)| inner(range))
            .map(|i| self.bins[i].width())
            .next();
        // with one bin per chromosome there is no full-width bin to go by,
        // so every bin must have the same span
        let single_bins = inner_width.is_none();
        let expected = inner_width.unwrap_or_else(|| self.bins[0].width());

        for (_, range) in &ranges {
            for index in inner(range) {
                let found = self.bins[index].width();
                if found != expected {
                    return Err(ContactMatrixError::InconsistentBinSize {
                        index,
                        expected,
                        found,
                    });
                }
            }
            let last = range.end - 1;
            let found = self.bins[last].width();
            if found > expected || (single_bins && found != expected) {
                return Err(ContactMatrixError::InconsistentBinSize {
                    index: last,
                    expected,
                    found,
                });
            }
        }

        Ok(expected)
    }

    ///
    /// Produce a new matrix with every entry (i, j) scaled by `factors[i] * factors[j]`.
    ///
    /// Entries touching a masked bin, or a bin whose factor is not finite,
    /// are dropped. The result records no correction factors of its own
    /// because they are already applied.
    ///
    pub fn apply_correction(&self, factors: &[f64]) -> Result<ContactMatrix> {
        if factors.len() != self.len() {
            return Err(ContactMatrixError::InvalidDimension {
                expected: self.len(),
                found: factors.len(),
            });
        }

        let mut tri = TriMat::with_capacity(self.matrix.shape(), self.nnz());
        for (&value, (row, col)) in self.matrix.iter() {
            if self.is_masked(row) || self.is_masked(col) {
                continue;
            }
            let (fr, fc) = (factors[row], factors[col]);
            if !fr.is_finite() || !fc.is_finite() {
                continue;
            }
            let corrected = value * (fr * fc);
            if !corrected.is_finite() || corrected < 0.0 {
                return Err(ContactMatrixError::InvalidContact {
                    row,
                    col,
                    value: corrected,
                });
            }
            tri.add_triplet(row, col, corrected);
        }

        Ok(ContactMatrix {
            matrix: tri.to_csr(),
            storage: self.storage,
            bins: self.bins.clone(),
            nan_bins: self.nan_bins.clone(),
            correction_factors: None,
            distance_counts: None,
        })
    }

    ///
    /// Sum intra-chromosomal contacts by the genomic distance between the
    /// starts of the two bins. Each unordered bin pair is counted once and
    /// masked bins are skipped.
    ///
    pub fn compute_distance_counts(&self) -> BTreeMap<u64, f64> {
        let mut counts: BTreeMap<u64, f64> = BTreeMap::new();
        for (row, col, value) in self.iter_upper() {
            if let Some(distance) = self.bins[row].distance_to(&self.bins[col]) {
                *counts.entry(distance).or_insert(0.0) += value;
            }
        }
        counts
    }
}

fn validate_bins(bins: &[Bin]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (index, bin) in bins.iter().enumerate() {
        if bin.end <= bin.start {
            return Err(ContactMatrixError::UnsortedBins { index });
        }
        match index.checked_sub(1).map(|p| &bins[p]) {
            Some(prev) if prev.chr == bin.chr => {
                if bin.start < prev.end {
                    return Err(ContactMatrixError::UnsortedBins { index });
                }
            }
            _ => {
                // a chromosome must occupy one contiguous block
                if !seen.insert(bin.chr.as_str()) {
                    return Err(ContactMatrixError::UnsortedBins { index });
                }
            }
        }
    }
    Ok(())
}
