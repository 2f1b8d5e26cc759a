use std::fmt::{self, Display};

///
/// Bin struct, one genomic interval that maps to a single row/column of a contact matrix
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bin {
    pub chr: String,
    pub start: u64,
    pub end: u64,
}

impl Bin {
    pub fn new(chr: impl Into<String>, start: u64, end: u64) -> Self {
        Bin {
            chr: chr.into(),
            start,
            end,
        }
    }

    ///
    /// Get the genomic span of the bin
    ///
    pub fn width(&self) -> u64 {
        self.end - self.start
    }

    ///
    /// Get the tab-separated bed string of the bin
    ///
    pub fn as_string(&self) -> String {
        format!("{}\t{}\t{}", self.chr, self.start, self.end)
    }

    /// Genomic distance between the starts of two bins on the same chromosome.
    /// Returns `None` for bins on different chromosomes.
    pub fn distance_to(&self, other: &Bin) -> Option<u64> {
        if self.chr != other.chr {
            return None;
        }
        Some(self.start.abs_diff(other.start))
    }
}

impl Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chr, self.start, self.end)
    }
}
