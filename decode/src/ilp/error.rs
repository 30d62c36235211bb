//! Model construction errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// The size budget must allow at least one sequence.
    #[error("library size limit must be at least 1, got {0}")]
    InvalidLimit(u64),
    #[error("at least one sub-library is required")]
    NoSublibraries,
    /// Binning needs at least one interval.
    #[error("bin count must be at least 1")]
    NoBins,
    #[error("no target sequences to cover")]
    NoTargets,
    #[error("codon table is empty")]
    EmptyCodonTable,
}
