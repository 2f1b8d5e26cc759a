use std::ops::Range;

use sprs::TriMat;

use hicmat_core::models::{Bin, ContactMatrix, Storage};
use hicmat_core::{ContactMatrixError, Result};

///
/// Merge every `merge_factor` consecutive bins of each chromosome into one bin.
///
/// A chromosome whose bin count is not a multiple of `merge_factor` ends with
/// one shorter group; groups never cross a chromosome boundary. Contacts that
/// touch a masked bin are skipped, and an output bin is masked only when all
/// of its input bins were masked.
///
/// The output carries no correction factors (a warning is logged when the
/// input had some) and no distance counts.
///
/// # Arguments
/// - matrix: the contact matrix to merge, with a uniform bin size
/// - merge_factor: number of input bins per output bin, at least 1
pub fn merge_bins(matrix: &ContactMatrix, merge_factor: usize) -> Result<ContactMatrix> {
    if merge_factor < 1 {
        return Err(ContactMatrixError::InvalidMergeFactor(format!(
            "merge factor must be at least 1, got {}",
            merge_factor
        )));
    }
    matrix.bin_size()?;

    let groups = group_bins(matrix, merge_factor);

    let mut lookup = vec![0usize; matrix.len()];
    for (new_idx, group) in groups.iter().enumerate() {
        for old_idx in group.clone() {
            lookup[old_idx] = new_idx;
        }
    }

    let bins = matrix.bins();
    let new_bins: Vec<Bin> = groups
        .iter()
        .map(|group| {
            let members = &bins[group.clone()];
            let start = members.iter().map(|b| b.start).min().unwrap_or_default();
            let end = members.iter().map(|b| b.end).max().unwrap_or_default();
            Bin::new(members[0].chr.clone(), start, end)
        })
        .collect();

    let new_nan_bins: Vec<usize> = groups
        .iter()
        .enumerate()
        .filter(|(_, group)| (*group).clone().all(|i| matrix.is_masked(i)))
        .map(|(new_idx, _)| new_idx)
        .collect();

    // sums go to the upper triangle; a full result mirrors it afterwards
    let n = new_bins.len();
    let mut tri = TriMat::with_capacity((n, n), matrix.nnz());
    for (&value, (row, col)) in matrix.csr().iter() {
        if row > col || matrix.is_masked(row) || matrix.is_masked(col) {
            continue;
        }
        let (new_row, new_col) = (lookup[row], lookup[col]);
        // the mirrored (col, row) contact lands on the same diagonal cell
        let value = match row != col && new_row == new_col {
            true => 2.0 * value,
            false => value,
        };
        tri.add_triplet(new_row, new_col, value);
    }

    if matrix.correction_factors().is_some() {
        log::warn!(
            "Correction factors are removed. They are not valid for the merged resolution"
        );
    }

    let merged = ContactMatrix::new(tri.to_csr(), new_bins, Storage::UpperTriangle)?;
    let merged = match matrix.storage() {
        Storage::UpperTriangle => merged,
        Storage::Full => {
            ContactMatrix::new(merged.to_symmetric(), merged.bins().to_vec(), Storage::Full)?
        }
    };
    merged.with_nan_bins(new_nan_bins)
}

///
/// Partition the bins of a matrix into runs of at most `merge_factor`
/// consecutive bins that never span two chromosomes.
///
pub fn group_bins(matrix: &ContactMatrix, merge_factor: usize) -> Vec<Range<usize>> {
    let mut groups = Vec::with_capacity(matrix.len() / merge_factor.max(1) + 1);
    for (_, range) in matrix.chromosome_ranges() {
        let mut start = range.start;
        while start < range.end {
            let end = (start + merge_factor).min(range.end);
            groups.push(start..end);
            start = end;
        }
    }
    groups
}

///
/// Get the merge factor that turns bins of `bin_size` into bins of `resolution`.
///
/// The resolution has to be a whole multiple of the bin size.
///
pub fn merge_factor_for(bin_size: u64, resolution: u64) -> Result<usize> {
    if bin_size == 0 || resolution < bin_size || resolution % bin_size != 0 {
        return Err(ContactMatrixError::InvalidMergeFactor(format!(
            "resolution {} is not a multiple of the bin size {}",
            resolution, bin_size
        )));
    }
    Ok((resolution / bin_size) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn bins(chr: &str, n: usize, size: u64) -> Vec<Bin> {
        (0..n as u64)
            .map(|i| Bin::new(chr, i * size, (i + 1) * size))
            .collect()
    }

    fn from_dense(dense: &[Vec<f64>], bins: Vec<Bin>, storage: Storage) -> ContactMatrix {
        let n = dense.len();
        let mut tri = TriMat::new((n, n));
        for (i, row) in dense.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 && (storage == Storage::Full || i <= j) {
                    tri.add_triplet(i, j, v);
                }
            }
        }
        ContactMatrix::new(tri.to_csr(), bins, storage).unwrap()
    }

    #[fixture]
    fn dense() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![2.0, 5.0, 6.0, 7.0],
            vec![3.0, 6.0, 8.0, 9.0],
            vec![4.0, 7.0, 9.0, 10.0],
        ]
    }

    #[rstest]
    #[case(Storage::Full)]
    #[case(Storage::UpperTriangle)]
    fn test_merge_four_bins_by_two(dense: Vec<Vec<f64>>, #[case] storage: Storage) {
        let m = from_dense(&dense, bins("chr1", 4, 10), storage);
        let merged = merge_bins(&m, 2).unwrap();

        assert_eq!(
            merged.bins(),
            &[Bin::new("chr1", 0, 20), Bin::new("chr1", 20, 40)]
        );
        assert_eq!(merged.get(0, 0), 1.0 + 2.0 + 2.0 + 5.0);
        assert_eq!(merged.get(0, 1), 3.0 + 4.0 + 6.0 + 7.0);
        assert_eq!(merged.get(1, 0), 3.0 + 4.0 + 6.0 + 7.0);
        assert_eq!(merged.get(1, 1), 8.0 + 9.0 + 9.0 + 10.0);
        assert_eq!(merged.storage(), storage);
        assert_eq!(merged.total_contacts(), m.total_contacts());
    }

    #[rstest]
    fn test_merge_full_storage_stays_symmetric() {
        let dense = vec![
            vec![0.1, 0.7, 0.3, 1e-3],
            vec![0.7, 0.2, 1.0 / 3.0, 0.9],
            vec![0.3, 1.0 / 3.0, 0.6, 0.05],
            vec![1e-3, 0.9, 0.05, 0.4],
        ];
        let m = from_dense(&dense, bins("chr1", 4, 10), Storage::Full);
        let merged = merge_bins(&m, 3).unwrap();

        assert_eq!(merged.storage(), Storage::Full);
        assert_eq!(merged.get(0, 1), merged.get(1, 0));
        assert!((merged.get(0, 1) - (1e-3 + 0.9 + 0.05)).abs() < 1e-12);
        assert!((merged.total_contacts() - m.total_contacts()).abs() < 1e-12);
    }

    #[rstest]
    fn test_merge_never_crosses_chromosomes() {
        let mut b = bins("chr1", 3, 10);
        b.extend(bins("chr2", 2, 10));
        let m = ContactMatrix::empty(b, Storage::UpperTriangle).unwrap();
        let merged = merge_bins(&m, 2).unwrap();

        assert_eq!(
            merged.bins(),
            &[
                Bin::new("chr1", 0, 20),
                Bin::new("chr1", 20, 30),
                Bin::new("chr2", 0, 20),
            ]
        );
    }

    #[rstest]
    fn test_merge_factor_one_keeps_layout(dense: Vec<Vec<f64>>) {
        let m = from_dense(&dense, bins("chr1", 4, 10), Storage::UpperTriangle);
        let merged = merge_bins(&m, 1).unwrap();
        assert_eq!(merged.bins(), m.bins());
        assert_eq!(merged.csr(), m.csr());
    }

    #[rstest]
    fn test_merge_factor_larger_than_chromosome(dense: Vec<Vec<f64>>) {
        let m = from_dense(&dense, bins("chr1", 4, 10), Storage::Full);
        let merged = merge_bins(&m, 10).unwrap();
        assert_eq!(merged.bins(), &[Bin::new("chr1", 0, 40)]);
        assert_eq!(merged.get(0, 0), m.total_contacts());
    }

    #[rstest]
    fn test_merge_rejects_zero_factor(dense: Vec<Vec<f64>>) {
        let m = from_dense(&dense, bins("chr1", 4, 10), Storage::Full);
        assert!(matches!(
            merge_bins(&m, 0),
            Err(ContactMatrixError::InvalidMergeFactor(_))
        ));
    }

    #[rstest]
    fn test_merge_rejects_uneven_bins() {
        let b = vec![
            Bin::new("chr1", 0, 10),
            Bin::new("chr1", 10, 30),
            Bin::new("chr1", 30, 40),
        ];
        let m = ContactMatrix::empty(b, Storage::Full).unwrap();
        assert!(matches!(
            merge_bins(&m, 2),
            Err(ContactMatrixError::InconsistentBinSize { .. })
        ));
    }

    #[rstest]
    fn test_merge_masking_policy(dense: Vec<Vec<f64>>) {
        let m = from_dense(&dense, bins("chr1", 4, 10), Storage::UpperTriangle)
            .with_nan_bins([0, 2, 3])
            .unwrap();
        let merged = merge_bins(&m, 2).unwrap();

        // group [0, 1] is partially masked, group [2, 3] fully masked
        assert!(!merged.is_masked(0));
        assert!(merged.is_masked(1));
        assert_eq!(merged.get(0, 0), 5.0);
        assert_eq!(merged.get(0, 1), 0.0);
    }

    #[rstest]
    fn test_merge_drops_correction_factors(dense: Vec<Vec<f64>>) {
        let m = from_dense(&dense, bins("chr1", 4, 10), Storage::UpperTriangle)
            .with_correction_factors(vec![1.0, 0.5, 0.5, 1.0])
            .unwrap();
        let m = m.clone().with_distance_counts(m.compute_distance_counts());
        let merged = merge_bins(&m, 2).unwrap();
        assert!(merged.correction_factors().is_none());
        assert!(merged.distance_counts().is_none());
    }

    #[rstest]
    #[case(10, 40, Some(4))]
    #[case(10, 10, Some(1))]
    #[case(10, 25, None)]
    #[case(10, 5, None)]
    #[case(0, 10, None)]
    fn test_merge_factor_for(#[case] bin_size: u64, #[case] res: u64, #[case] expected: Option<usize>) {
        assert_eq!(merge_factor_for(bin_size, res).ok(), expected);
    }
}
