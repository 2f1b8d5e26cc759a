//! # Core data model for Hi-C contact matrices.
//!
//! A [ContactMatrix](models::ContactMatrix) couples a sparse, symmetric matrix of
//! contact counts with the genomic [Bin](models::Bin)s that index its rows and
//! columns, the set of masked bins, and optional correction factors. Every other
//! hicmat crate (merging, balancing, file formats) consumes and produces this type.
//!
//! ```
//! use hicmat_core::models::{Bin, ContactMatrix, Storage};
//! use sprs::TriMat;
//!
//! let bins = vec![Bin::new("chr1", 0, 10), Bin::new("chr1", 10, 20)];
//! let mut tri = TriMat::new((2, 2));
//! tri.add_triplet(0, 0, 3.0);
//! tri.add_triplet(0, 1, 1.0);
//!
//! let matrix = ContactMatrix::new(tri.to_csr(), bins, Storage::UpperTriangle).unwrap();
//! assert_eq!(matrix.get(1, 0), 1.0);
//! assert_eq!(matrix.bin_size().unwrap(), 10);
//! ```
pub mod errors;
pub mod models;

pub use errors::*;
