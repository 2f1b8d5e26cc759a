//! # Multi-resolution aggregation of contact matrices.
//!
//! [merge_bins] sums the contacts of every `k` consecutive bins of a chromosome
//! into one coarser bin, and [build_pyramid] produces a whole set of resolutions
//! from a single base matrix.
//!
//! Correction factors never survive a merge: they are only valid at the
//! resolution they were computed for, so merged matrices must be balanced again.
pub mod merge;
pub mod pyramid;

// re-exports
pub use merge::*;
pub use pyramid::*;
