pub mod bin;
pub mod contact_matrix;

// re-export for cleaner imports
pub use self::bin::Bin;
pub use self::contact_matrix::{ContactMatrix, Storage};
