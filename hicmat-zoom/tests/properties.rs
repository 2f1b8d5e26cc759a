use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::*;
use sprs::TriMat;

use hicmat_core::models::{Bin, ContactMatrix, Storage};
use hicmat_zoom::{group_bins, merge_bins};

/// Random sparse symmetric matrix over chromosomes with the given bin counts.
fn random_matrix(rng: &mut StdRng, chrom_bins: &[usize], storage: Storage) -> ContactMatrix {
    let mut bins = Vec::new();
    for (c, &n) in chrom_bins.iter().enumerate() {
        for i in 0..n as u64 {
            bins.push(Bin::new(format!("chr{}", c + 1), i * 1000, (i + 1) * 1000));
        }
    }
    let n = bins.len();
    let mut tri = TriMat::new((n, n));
    for i in 0..n {
        for j in i..n {
            if rng.random_bool(0.4) {
                let value = rng.random_range(1..50) as f64;
                tri.add_triplet(i, j, value);
                if storage == Storage::Full && i != j {
                    tri.add_triplet(j, i, value);
                }
            }
        }
    }
    ContactMatrix::new(tri.to_csr(), bins, storage).unwrap()
}

#[fixture]
fn rng() -> StdRng {
    StdRng::seed_from_u64(2024)
}

mod tests {
    use super::*;

    #[rstest]
    #[case(Storage::Full)]
    #[case(Storage::UpperTriangle)]
    fn test_merge_preserves_total_contacts(mut rng: StdRng, #[case] storage: Storage) {
        for factor in 1..6 {
            let m = random_matrix(&mut rng, &[13, 7, 4], storage);
            let merged = merge_bins(&m, factor).unwrap();
            assert!(
                (merged.total_contacts() - m.total_contacts()).abs() < 1e-6,
                "mass changed for merge factor {}",
                factor
            );
        }
    }

    #[rstest]
    #[case(2, 3)]
    #[case(3, 2)]
    #[case(2, 2)]
    fn test_merge_is_associative(mut rng: StdRng, #[case] a: usize, #[case] b: usize) {
        // chromosome lengths aligned to both factors
        let m = random_matrix(&mut rng, &[12, 6, 18], Storage::UpperTriangle);

        let stepwise = merge_bins(&merge_bins(&m, a).unwrap(), b).unwrap();
        let direct = merge_bins(&m, a * b).unwrap();

        assert_eq!(stepwise.bins(), direct.bins());
        assert_eq!(stepwise.len(), direct.len());
        for i in 0..direct.len() {
            for j in 0..direct.len() {
                assert!((stepwise.get(i, j) - direct.get(i, j)).abs() < 1e-9);
            }
        }
    }

    #[rstest]
    fn test_masked_iff_all_members_masked(mut rng: StdRng) {
        for round in 0..20 {
            let mut m = random_matrix(&mut rng, &[9, 5], Storage::UpperTriangle);
            let masked: Vec<usize> = (0..m.len()).filter(|_| rng.random_bool(0.5)).collect();
            m.mask(masked).unwrap();

            let factor = 1 + round % 4;
            let merged = merge_bins(&m, factor).unwrap();
            let groups = group_bins(&m, factor);

            assert_eq!(groups.len(), merged.len());
            for (idx, group) in groups.into_iter().enumerate() {
                let all_masked = group.clone().all(|i| m.is_masked(i));
                assert_eq!(merged.is_masked(idx), all_masked, "group {:?}", group);
            }
            // masked input bins contribute nothing
            assert!((merged.total_contacts() - m.total_contacts()).abs() < 1e-6);
        }
    }
}
