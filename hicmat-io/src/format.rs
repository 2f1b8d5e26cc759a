use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hicmat_core::models::ContactMatrix;

use crate::error::{MatrixIoError, Result};
use crate::{ginteractions, hicpro};

/// The on-disk layouts hicmat can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    HicPro,
    GInteractions,
}

impl FromStr for MatrixFormat {
    type Err = MatrixIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hicpro" => Ok(MatrixFormat::HicPro),
            "ginteractions" => Ok(MatrixFormat::GInteractions),
            _ => Err(MatrixIoError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl Display for MatrixFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixFormat::HicPro => write!(f, "hicpro"),
            MatrixFormat::GInteractions => write!(f, "ginteractions"),
        }
    }
}

/// How a matrix is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Write each bin pair once, the mirrored contact being implied.
    /// HiC-Pro output is always upper triangular and ignores this.
    pub symmetric: bool,
    /// Scale the contacts by the matrix's correction factors before writing.
    pub apply_correction: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            symmetric: true,
            apply_correction: false,
        }
    }
}

///
/// A contact matrix file in one of the supported formats, together with the
/// side files the format needs.
///
#[derive(Debug, Clone)]
pub struct MatrixFile {
    pub format: MatrixFormat,
    pub matrix_path: PathBuf,
    pub bed_path: Option<PathBuf>,
    pub biases_path: Option<PathBuf>,
}

impl MatrixFile {
    pub fn new<P: AsRef<Path>>(format: MatrixFormat, matrix_path: P) -> Self {
        MatrixFile {
            format,
            matrix_path: matrix_path.as_ref().to_path_buf(),
            bed_path: None,
            biases_path: None,
        }
    }

    pub fn with_bed<P: AsRef<Path>>(mut self, bed_path: P) -> Self {
        self.bed_path = Some(bed_path.as_ref().to_path_buf());
        self
    }

    pub fn with_biases<P: AsRef<Path>>(mut self, biases_path: P) -> Self {
        self.biases_path = Some(biases_path.as_ref().to_path_buf());
        self
    }

    ///
    /// Read the matrix, its bins, masked bins and correction factors.
    ///
    pub fn load(&self) -> Result<ContactMatrix> {
        log::info!("Loading {} matrix from {}", self.format, self.matrix_path.display());
        match self.format {
            MatrixFormat::HicPro => {
                let bed_path = self
                    .bed_path
                    .as_deref()
                    .ok_or_else(|| MatrixIoError::MissingBedFile(self.format.to_string()))?;
                hicpro::load(&self.matrix_path, bed_path, self.biases_path.as_deref())
            }
            MatrixFormat::GInteractions => Err(MatrixIoError::UnsupportedFormat(format!(
                "{} can only be written",
                self.format
            ))),
        }
    }

    ///
    /// Write a matrix in this file's format.
    ///
    pub fn save(&self, matrix: &ContactMatrix, options: SaveOptions) -> Result<()> {
        log::info!("Saving {} matrix to {}", self.format, self.matrix_path.display());

        let corrected;
        let matrix = match matrix.correction_factors() {
            Some(factors) if options.apply_correction => {
                corrected = matrix.apply_correction(factors)?;
                &corrected
            }
            _ => matrix,
        };

        match self.format {
            MatrixFormat::HicPro => {
                let bed_path = self
                    .bed_path
                    .as_deref()
                    .ok_or_else(|| MatrixIoError::MissingBedFile(self.format.to_string()))?;
                let biases_path = self
                    .biases_path
                    .clone()
                    .unwrap_or_else(|| hicpro::default_biases_path(&self.matrix_path));
                hicpro::save(matrix, &self.matrix_path, bed_path, &biases_path)
            }
            MatrixFormat::GInteractions => {
                ginteractions::save(matrix, &self.matrix_path, options.symmetric)
            }
        }
    }
}
