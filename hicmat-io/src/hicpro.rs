//! HiC-Pro sparse matrices.
//!
//! A matrix is stored as two (optionally gzip'd) text files:
//! - the matrix: `bin_i  bin_j  count`, 1-based bin ids, usually upper triangle only
//! - the bed file: `chr  start  end  bin_id`, one line per bin
//!
//! Correction factors live in a third file with one factor per bin, in bed
//! order. A `nan` factor marks a masked bin.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use sprs::TriMat;

use hicmat_core::models::{Bin, ContactMatrix, Storage};

use crate::error::{MatrixIoError, Result};
use crate::utils::{format_count, get_dynamic_reader, parse_field, write_dynamic};

/// `sample.matrix` -> `sample.matrix.biases`
pub fn default_biases_path(matrix_path: &Path) -> PathBuf {
    let mut path = matrix_path.as_os_str().to_owned();
    path.push(".biases");
    PathBuf::from(path)
}

///
/// Read the bins of a HiC-Pro bed file, returning them in file order along
/// with a map from HiC-Pro bin id to matrix index.
///
pub fn read_bins(path: &Path) -> Result<(Vec<Bin>, HashMap<u64, usize>)> {
    let reader = get_dynamic_reader(path)?;
    let mut bins = Vec::new();
    let mut ids = HashMap::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let chr: String = parse_field(fields.next(), "chromosome", path, line_no + 1)?;
        let start: u64 = parse_field(fields.next(), "start", path, line_no + 1)?;
        let end: u64 = parse_field(fields.next(), "end", path, line_no + 1)?;
        let id: u64 = parse_field(fields.next(), "bin id", path, line_no + 1)?;

        if ids.insert(id, bins.len()).is_some() {
            return Err(MatrixIoError::Parse {
                path: path.display().to_string(),
                line: line_no + 1,
                message: format!("duplicate bin id {}", id),
            });
        }
        bins.push(Bin::new(chr, start, end));
    }

    Ok((bins, ids))
}

///
/// Read a biases file: one correction factor per line, `nan` for masked bins.
///
pub fn read_biases(path: &Path) -> Result<Vec<f64>> {
    let reader = get_dynamic_reader(path)?;
    let mut biases = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        biases.push(parse_field(Some(line), "bias", path, line_no + 1)?);
    }
    Ok(biases)
}

///
/// Load a HiC-Pro matrix.
///
/// # Arguments
/// - matrix_path: the sparse triplet file
/// - bed_path: the bins
/// - biases_path: optional correction factors; bins with a `nan` factor are masked
pub fn load(matrix_path: &Path, bed_path: &Path, biases_path: Option<&Path>) -> Result<ContactMatrix> {
    let (bins, ids) = read_bins(bed_path)?;
    let n = bins.len();

    let reader = get_dynamic_reader(matrix_path)?;
    let mut tri = TriMat::new((n, n));
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let i: u64 = parse_field(fields.next(), "bin id", matrix_path, line_no + 1)?;
        let j: u64 = parse_field(fields.next(), "bin id", matrix_path, line_no + 1)?;
        let count: f64 = parse_field(fields.next(), "count", matrix_path, line_no + 1)?;

        let lookup = |id: u64| {
            ids.get(&id).copied().ok_or_else(|| MatrixIoError::Parse {
                path: matrix_path.display().to_string(),
                line: line_no + 1,
                message: format!("bin id {} is not in {}", id, bed_path.display()),
            })
        };
        let (row, col) = (lookup(i)?, lookup(j)?);
        if count != 0.0 {
            tri.add_triplet(row, col, count);
        }
    }

    let mut matrix = ContactMatrix::new(tri.to_csr(), bins, Storage::UpperTriangle)?;

    if let Some(biases_path) = biases_path {
        let biases = read_biases(biases_path)?;
        let masked: Vec<usize> = biases
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_finite())
            .map(|(i, _)| i)
            .collect();
        matrix.set_correction_factors(Some(biases))?;
        matrix.mask(masked)?;
    }

    log::info!(
        "Loaded {} bins and {} contacts, {} masked",
        matrix.len(),
        matrix.nnz(),
        matrix.nan_bins().len()
    );
    Ok(matrix)
}

///
/// Save a matrix as HiC-Pro files.
///
/// Only the upper triangle is written, whatever the matrix's storage.
/// A biases file is written when the matrix carries correction factors or
/// masked bins; without factors, unmasked bins get a neutral factor of 1.
///
pub fn save(
    matrix: &ContactMatrix,
    matrix_path: &Path,
    bed_path: &Path,
    biases_path: &Path,
) -> Result<()> {
    let contacts = matrix.upper_triangle();

    write_dynamic(matrix_path, |w| {
        for (&value, (row, col)) in contacts.iter() {
            writeln!(w, "{}\t{}\t{}", row + 1, col + 1, format_count(value))?;
        }
        Ok(())
    })?;

    write_dynamic(bed_path, |w| {
        for (i, bin) in matrix.bins().iter().enumerate() {
            writeln!(w, "{}\t{}", bin.as_string(), i + 1)?;
        }
        Ok(())
    })?;

    if matrix.correction_factors().is_some() || !matrix.nan_bins().is_empty() {
        write_dynamic(biases_path, |w| {
            for i in 0..matrix.len() {
                match matrix.correction_factors() {
                    _ if matrix.is_masked(i) => writeln!(w, "nan")?,
                    Some(factors) => writeln!(w, "{}", factors[i])?,
                    None => writeln!(w, "1")?,
                }
            }
            Ok(())
        })?;
    }

    Ok(())
}
