//! End-to-end design run: encode, formulate, solve, decode.

use crate::alignment::{Alignment, AlignmentError};
use crate::codon_table::CodonTable;
use crate::config::DesignConfig;
use crate::decoder::{DecodeError, Decoder, LibraryToken};
use crate::encoder::{encode, EncodeError, EncodedTargets};
use crate::ilp::{build_library_model, LibraryModel, ModelError, SizeRegime};
use crate::solver::{SolveError, SolveStatus, Solver, SolverOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesignError {
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Persisted result of one design run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    /// False when the solver stopped on a limit with an incumbent.
    pub solution_optimal: bool,
    pub fixed_positions: BTreeMap<usize, char>,
    pub variable_positions: Vec<usize>,
    pub sequences: Vec<String>,
    /// Solver's `t` per target.
    pub coverage: Vec<bool>,
    /// Non-zero probability in the decoded library, per target.
    pub in_library: Vec<bool>,
    pub n_var_pos: usize,
    pub n_covered: usize,
    pub total_lib_size: u64,
    /// Size bound enforced by the binned constraint, if binning was used.
    pub size_upper_bound: Option<f64>,
    /// Summed over targets, in `[0, n_targets]`.
    pub on_target_p: f64,
    pub mean_on_target_p: f64,
    pub parsed_lib: Vec<Vec<LibraryToken>>,
    pub construct_time: f64,
    pub solve_time: f64,
    pub total_time: f64,
}

impl SolutionRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Decode a solver outcome for `model` into a record. Timings are filled by
/// the caller.
pub fn decode_outcome(
    targets: &EncodedTargets,
    model: &LibraryModel,
    outcome: &SolverOutcome,
    table: &CodonTable,
) -> Result<SolutionRecord, DesignError> {
    if outcome.status == SolveStatus::Infeasible {
        return Err(SolveError::Infeasible.into());
    }
    if !outcome.is_optimal() {
        tracing::warn!("solver returned a limit-bounded incumbent; solution may be suboptimal");
    }

    let decoder = Decoder::from_assignments(table, &model.layout, &outcome.assignments)?;
    let coverage = model.layout.coverage(&outcome.assignments);
    let n_covered = coverage.iter().filter(|&&c| c).count();
    let in_library = targets.sequences.iter().map(|s| decoder.in_library(s)).collect();
    let total_lib_size = decoder.total_lib_size();
    let on_target_p = decoder.on_target_probability(&targets.sequences);
    let parsed_lib = decoder.parse_lib(targets.width(), &targets.fixed_positions)?;

    let size_upper_bound = match &model.regime {
        SizeRegime::Exact => None,
        SizeRegime::Binned(edges) => {
            let bins: Option<Vec<usize>> = model.layout.selected_bins(&outcome.assignments).into_iter().collect();
            bins.map(|b| edges.upper_bound(&b))
        }
    };

    tracing::info!(
        "covered {}/{} targets, library size {}, on-target probability {:.5}",
        n_covered,
        targets.n_targets(),
        total_lib_size,
        on_target_p
    );

    Ok(SolutionRecord {
        solution_optimal: outcome.is_optimal(),
        fixed_positions: targets.fixed_positions.clone(),
        variable_positions: targets.variable_positions.clone(),
        sequences: targets.sequences.clone(),
        coverage,
        in_library,
        n_var_pos: targets.n_var_pos(),
        n_covered,
        total_lib_size,
        size_upper_bound,
        on_target_p,
        mean_on_target_p: on_target_p / targets.n_targets().max(1) as f64,
        parsed_lib,
        construct_time: 0.0,
        solve_time: outcome.solve_time.as_secs_f64(),
        total_time: 0.0,
    })
}

/// Encoded targets and their formulated model, ready to solve.
#[derive(Debug, Clone)]
pub struct PreparedDesign {
    pub targets: EncodedTargets,
    pub model: LibraryModel,
    pub construct_time: Duration,
}

/// Validate, encode and formulate without solving.
pub fn prepare_design(
    aln: &Alignment,
    cfg: &DesignConfig,
    table: &CodonTable,
) -> Result<PreparedDesign, DesignError> {
    cfg.validate()?;
    let start = Instant::now();
    let targets = encode(aln)?;
    tracing::info!(
        "library size limit {}, sub-library limit {}, {} targets, {} variable positions",
        cfg.lib_limit,
        cfg.n_sublibs,
        targets.n_targets(),
        targets.n_var_pos()
    );
    let model = build_library_model(&targets, &cfg.library_params(), table)?;
    Ok(PreparedDesign {
        targets,
        model,
        construct_time: start.elapsed(),
    })
}

/// Solve a prepared model and decode the result.
pub fn solve_design<S: Solver + ?Sized>(
    prepared: &PreparedDesign,
    cfg: &DesignConfig,
    table: &CodonTable,
    solver: &S,
) -> Result<SolutionRecord, DesignError> {
    let start = Instant::now();
    let outcome = solver.solve(&prepared.model.ilp, &cfg.solve_options())?;
    let mut record = decode_outcome(&prepared.targets, &prepared.model, &outcome, table)?;

    // a solver's own clock may run past ours
    let elapsed = start.elapsed().max(outcome.solve_time);
    record.total_time = (prepared.construct_time + elapsed).as_secs_f64();
    record.construct_time = (record.total_time - record.solve_time).max(0.0);
    Ok(record)
}

/// Run the full pipeline on an alignment.
pub fn design_library<S: Solver + ?Sized>(
    aln: &Alignment,
    cfg: &DesignConfig,
    table: &CodonTable,
    solver: &S,
) -> Result<SolutionRecord, DesignError> {
    let prepared = prepare_design(aln, cfg, table)?;
    solve_design(&prepared, cfg, table, solver)
}
