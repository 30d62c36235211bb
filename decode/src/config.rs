//! Run configuration for a library design.

use crate::ilp::{LibraryParams, ModelError};
use crate::solver::SolveOptions;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BINS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignConfig {
    /// Total library size limit (sequences across all sub-libraries).
    pub lib_limit: u64,

    /// Maximum number of sub-libraries.
    pub n_sublibs: usize,

    /// Bins for the approximate size constraint (clamped to `lib_limit`).
    pub bins: usize,

    /// Use the binned size constraint even for a single sub-library.
    pub approximate: bool,

    /// Solver time limit in seconds (0 = unbounded).
    pub time_limit: f64,

    /// Solver threads (0 = solver default).
    pub threads: usize,

    /// Show solver output.
    pub verbose: bool,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            lib_limit: 1_000_000,
            n_sublibs: 1,
            bins: DEFAULT_BINS,
            approximate: false,
            time_limit: 0.0,
            threads: 0,
            verbose: false,
        }
    }
}

impl DesignConfig {
    pub fn new(lib_limit: u64, n_sublibs: usize) -> Result<Self, ModelError> {
        let cfg = Self {
            lib_limit,
            n_sublibs,
            ..Self::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.lib_limit == 0 {
            return Err(ModelError::InvalidLimit(self.lib_limit));
        }
        if self.n_sublibs == 0 {
            return Err(ModelError::NoSublibraries);
        }
        if self.bins == 0 {
            return Err(ModelError::NoBins);
        }
        Ok(())
    }

    pub fn library_params(&self) -> LibraryParams {
        LibraryParams {
            lib_limit: self.lib_limit,
            n_sublibs: self.n_sublibs,
            bins: self.bins,
            approximate: self.approximate,
        }
    }

    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_limit: self.time_limit,
            threads: self.threads,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        let cfg = DesignConfig::new(500, 3).unwrap();
        assert_eq!(cfg.bins, DEFAULT_BINS);
        assert_eq!(cfg.library_params().n_sublibs, 3);
        assert_eq!(DesignConfig::new(0, 1), Err(ModelError::InvalidLimit(0)));
        assert_eq!(DesignConfig::new(10, 0), Err(ModelError::NoSublibraries));
    }
}
