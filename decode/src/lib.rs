//! Degenerate codon library design.
//!
//! Given aligned target proteins, choose a degenerate codon for every
//! variable position of up to `n_sublibs` sub-libraries so that as many
//! targets as possible are covered while the pooled library stays within a
//! sequence budget. The choice is formulated as a 0/1 integer program and
//! handed to an external MIP solver.

pub mod alignment;
pub mod alphabet;
pub mod codon_table;
pub mod config;
pub mod decoder;
pub mod design;
pub mod encoder;
pub mod ilp;
pub mod simulate;
pub mod solver;

pub use alignment::{Alignment, AlignmentFormat};
pub use codon_table::CodonTable;
pub use config::DesignConfig;
pub use decoder::{Decoder, LibraryToken};
pub use design::{
    design_library, prepare_design, solve_design, DesignError, PreparedDesign, SolutionRecord,
};
pub use encoder::{encode, EncodedTargets};
pub use ilp::{build_library_model, LibraryModel, LibraryParams};
pub use solver::{ScipSolver, SolveStatus, Solver};
