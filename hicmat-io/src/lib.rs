//! # Reading and writing contact matrices.
//!
//! The numeric crates only ever see a [ContactMatrix](hicmat_core::models::ContactMatrix).
//! This crate moves matrices between that shape and a small, closed set of
//! plain-text layouts, picked with [MatrixFormat]:
//!
//! - `hicpro`: HiC-Pro sparse triplets plus a bed file of bins, and an
//!   optional biases file carrying correction factors
//! - `ginteractions`: one line per contact with both bins spelled out (write only)
//!
//! Files ending in `.gz` are decompressed on read and compressed on write.
pub mod error;
pub mod format;
pub mod ginteractions;
pub mod hicpro;
pub mod utils;

// re-expose core functions
pub use error::*;
pub use format::*;
