//! # Knight–Ruiz balancing of Hi-C contact matrices.
//!
//! Computes a scaling vector `x` such that `diag(x) · M · diag(x)` has every
//! unmasked row (and column) summing to the same target. The solver is the
//! Newton method of Knight and Ruiz (2012) with an inner conjugate-gradient
//! solve, falling back to a damped symmetric Sinkhorn step whenever the
//! Newton step makes no progress.
//!
//! ```
//! use hicmat_balance::{BalancerConfig, KnightRuiz};
//! use hicmat_core::models::{Bin, ContactMatrix, Storage};
//! use sprs::TriMat;
//!
//! let bins = vec![Bin::new("chr1", 0, 10), Bin::new("chr1", 10, 20)];
//! let mut tri = TriMat::new((2, 2));
//! tri.add_triplet(0, 0, 2.0);
//! tri.add_triplet(0, 1, 1.0);
//! tri.add_triplet(1, 1, 4.0);
//! let matrix = ContactMatrix::new(tri.to_csr(), bins, Storage::UpperTriangle).unwrap();
//!
//! let balance = KnightRuiz::new(BalancerConfig::default()).balance(&matrix).unwrap();
//! let balanced = balance.apply_to(&matrix).unwrap();
//! for sum in balanced.row_sums() {
//!     assert!((sum - 1.0).abs() < 1e-6);
//! }
//! ```
pub mod config;
pub mod errors;
pub mod knight_ruiz;
mod system;

// re-exports
pub use config::*;
pub use errors::*;
pub use knight_ruiz::*;
