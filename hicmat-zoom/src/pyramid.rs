use hicmat_core::Result;
use hicmat_core::models::ContactMatrix;

use crate::merge::{merge_bins, merge_factor_for};

///
/// Build one merged matrix per requested resolution.
///
/// Resolutions are processed from finest to coarsest, and each one is merged
/// from the coarsest resolution built so far that divides it, falling back to
/// the base matrix. Duplicate resolutions are built once.
///
/// # Arguments
/// - matrix: base matrix with a uniform bin size
/// - resolutions: target bin sizes, each a multiple of the base bin size
pub fn build_pyramid(
    matrix: &ContactMatrix,
    resolutions: &[u64],
) -> Result<Vec<(u64, ContactMatrix)>> {
    let base = matrix.bin_size()?;

    let mut targets = resolutions.to_vec();
    targets.sort_unstable();
    targets.dedup();

    // reject any bad resolution before merging anything
    for &resolution in &targets {
        merge_factor_for(base, resolution)?;
    }

    let mut built: Vec<(u64, ContactMatrix)> = Vec::with_capacity(targets.len());
    for resolution in targets {
        let (source_res, source) = built
            .iter()
            .rev()
            .find(|(res, _)| resolution % res == 0)
            .map(|(res, m)| (*res, m))
            .unwrap_or((base, matrix));

        let factor = merge_factor_for(source_res, resolution)?;
        log::info!(
            "Merging {} bp bins into {} bp bins (merge factor {})",
            source_res,
            resolution,
            factor
        );

        let merged = merge_bins(source, factor)?;
        built.push((resolution, merged));
    }

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;

    use hicmat_core::ContactMatrixError;
    use hicmat_core::models::{Bin, Storage};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sprs::TriMat;

    fn matrix() -> ContactMatrix {
        let n = 12;
        let bins = (0..n as u64)
            .map(|i| Bin::new("chr1", i * 100, (i + 1) * 100))
            .collect();
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            for j in i..n {
                tri.add_triplet(i, j, (1 + i + j) as f64);
            }
        }
        ContactMatrix::new(tri.to_csr(), bins, Storage::UpperTriangle).unwrap()
    }

    #[rstest]
    fn test_pyramid_sorted_and_deduplicated() {
        let pyramid = build_pyramid(&matrix(), &[400, 200, 1200, 200]).unwrap();
        let resolutions: Vec<u64> = pyramid.iter().map(|(r, _)| *r).collect();
        assert_eq!(resolutions, vec![200, 400, 1200]);
        assert_eq!(pyramid[0].1.len(), 6);
        assert_eq!(pyramid[1].1.len(), 3);
        assert_eq!(pyramid[2].1.len(), 1);
    }

    #[rstest]
    fn test_pyramid_matches_direct_merge() {
        let m = matrix();
        let pyramid = build_pyramid(&m, &[200, 600]).unwrap();
        let direct = merge_bins(&m, 6).unwrap();

        assert_eq!(pyramid[1].1.bins(), direct.bins());
        assert_eq!(pyramid[1].1.csr(), direct.csr());
    }

    #[rstest]
    fn test_pyramid_preserves_mass() {
        let m = matrix();
        for (_, merged) in build_pyramid(&m, &[300, 500, 1000]).unwrap() {
            assert!((merged.total_contacts() - m.total_contacts()).abs() < 1e-9);
        }
    }

    #[rstest]
    fn test_pyramid_rejects_incompatible_resolution() {
        assert!(matches!(
            build_pyramid(&matrix(), &[200, 250]),
            Err(ContactMatrixError::InvalidMergeFactor(_))
        ));
    }
}
