//! GInteractions tables: one contact per line as
//! `chr1  start1  end1  chr2  start2  end2  count`.
use std::io::Write;
use std::path::Path;

use hicmat_core::models::ContactMatrix;

use crate::error::Result;
use crate::utils::{format_count, write_dynamic};

///
/// Write the unmasked contacts of a matrix as a GInteractions table.
///
/// # Arguments
/// - matrix: the matrix to write
/// - path: output file, gzip'd if it ends in `.gz`
/// - symmetric: write each bin pair once (upper triangle) instead of both orientations
pub fn save(matrix: &ContactMatrix, path: &Path, symmetric: bool) -> Result<()> {
    let contacts = match symmetric {
        true => matrix.upper_triangle(),
        false => matrix.to_symmetric(),
    };
    let bins = matrix.bins();

    write_dynamic(path, |w| {
        for (&value, (row, col)) in contacts.iter() {
            if matrix.is_masked(row) || matrix.is_masked(col) {
                continue;
            }
            writeln!(
                w,
                "{}\t{}\t{}",
                bins[row].as_string(),
                bins[col].as_string(),
                format_count(value)
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use hicmat_core::models::{Bin, Storage};
    use pretty_assertions::assert_eq;
    use rstest::*;
    use sprs::TriMat;

    #[fixture]
    fn matrix() -> ContactMatrix {
        let bins = vec![
            Bin::new("chr1", 0, 100),
            Bin::new("chr1", 100, 200),
            Bin::new("chr2", 0, 100),
        ];
        let mut tri = TriMat::new((3, 3));
        tri.add_triplet(0, 0, 5.0);
        tri.add_triplet(0, 1, 2.0);
        tri.add_triplet(1, 2, 0.5);
        ContactMatrix::new(tri.to_csr(), bins, Storage::UpperTriangle).unwrap()
    }

    #[rstest]
    fn test_save_upper(matrix: ContactMatrix) {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("out.ginteractions.tsv");
        save(&matrix, &path, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "chr1\t0\t100\tchr1\t0\t100\t5\n\
             chr1\t0\t100\tchr1\t100\t200\t2\n\
             chr1\t100\t200\tchr2\t0\t100\t0.5\n"
        );
    }

    #[rstest]
    fn test_save_both_orientations(matrix: ContactMatrix) {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("out.tsv");
        save(&matrix, &path, false).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 5);
        assert!(written.contains("chr2\t0\t100\tchr1\t100\t200\t0.5\n"));
    }

    #[rstest]
    fn test_masked_contacts_skipped(matrix: ContactMatrix) {
        let matrix = matrix.with_nan_bins([2]).unwrap();
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("out.tsv");
        save(&matrix, &path, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(!written.contains("chr2"));
    }
}
