//! External MIP solver interface and a SCIP command-line driver.

use crate::ilp::Ilp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("failed to spawn solver `{bin}`: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("solver I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("model is infeasible: relax the library size limit or allow more sub-libraries")]
    Infeasible,
    #[error("solver stopped without a feasible solution ({0})")]
    NoIncumbent(String),
    #[error("could not parse solver output: {0}")]
    Parse(String),
}

/// Outcome reported by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Certified optimum.
    Optimal,
    /// Incumbent returned after a time, gap or node limit.
    Limited,
    Infeasible,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Seconds; 0 leaves the solver unbounded.
    pub time_limit: f64,
    /// 0 keeps the solver default.
    pub threads: usize,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub assignments: HashMap<String, f64>,
    pub solve_time: Duration,
}

impl SolverOutcome {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

pub trait Solver {
    /// Solve `ilp`. An infeasible model is reported as an outcome, not an error.
    fn solve(&self, ilp: &Ilp, opts: &SolveOptions) -> Result<SolverOutcome, SolveError>;
}

/// Runs the `scip` binary on an LP file written to a scratch directory.
#[derive(Debug, Clone)]
pub struct ScipSolver {
    pub bin: String,
}

impl Default for ScipSolver {
    /// `SCIP_BIN` if set, otherwise `scip` from `PATH`.
    fn default() -> Self {
        Self {
            bin: std::env::var("SCIP_BIN").unwrap_or_else(|_| "scip".to_string()),
        }
    }
}

impl ScipSolver {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn commands(lp_path: &Path, sol_path: &Path, opts: &SolveOptions) -> String {
        let mut cmds = format!("read {}\n", lp_path.display());
        if !opts.verbose {
            cmds.push_str("set display verblevel 0\n");
        }
        if opts.time_limit > 0.0 {
            cmds.push_str(&format!("set limits time {}\n", opts.time_limit));
        }
        if opts.threads > 0 {
            // overall thread cap, then the LP solver's own
            cmds.push_str(&format!("set parallel maxnthreads {}\n", opts.threads));
            cmds.push_str(&format!("set lp threads {}\n", opts.threads));
        }
        cmds.push_str("set write printzeros TRUE\n");
        cmds.push_str(&format!(
            "optimize\nwrite solution {}\nquit\n",
            sol_path.display()
        ));
        cmds
    }
}

impl Solver for ScipSolver {
    fn solve(&self, ilp: &Ilp, opts: &SolveOptions) -> Result<SolverOutcome, SolveError> {
        let dir = tempfile::TempDir::new()?;
        let lp_path: PathBuf = dir.path().join("library.lp");
        let sol_path: PathBuf = dir.path().join("library.sol");
        std::fs::write(&lp_path, ilp.to_lp())?;

        let start = Instant::now();
        let mut child = Command::new(&self.bin)
            .stdin(Stdio::piped())
            .stdout(if opts.verbose { Stdio::inherit() } else { Stdio::null() })
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SolveError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        let cmds = Self::commands(&lp_path, &sol_path, opts);
        if let Some(stdin) = child.stdin.as_mut() {
            stdin.write_all(cmds.as_bytes())?;
        }
        let out = child.wait_with_output()?;
        let solve_time = start.elapsed();

        if !out.status.success() {
            return Err(SolveError::Failed {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }

        let sol_txt = std::fs::read_to_string(&sol_path)?;
        let parsed = parse_scip_sol(&sol_txt)?;
        tracing::info!(
            "SCIP finished in {:.2}s with status {:?}",
            solve_time.as_secs_f64(),
            parsed.status
        );
        Ok(SolverOutcome {
            status: parsed.status,
            objective: parsed.objective,
            assignments: parsed.assignments,
            solve_time,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSolution {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub assignments: HashMap<String, f64>,
}

/// Parse a SCIP `.sol` file.
/// - `solution status:` decides optimal / limited / infeasible
/// - parses objective value if present
/// - parses `<var> <value> [(obj:..)]` assignments
pub fn parse_scip_sol(sol: &str) -> Result<ParsedSolution, SolveError> {
    let mut status_line: Option<String> = None;
    let mut no_solution = false;
    let mut objective = None;
    let mut assignments = HashMap::new();

    for line in sol.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("solution status:") {
            status_line = Some(rest.trim().to_ascii_lowercase());
            continue;
        }
        if line.starts_with("no solution available") {
            no_solution = true;
            continue;
        }
        if let Some(rest) = line
            .strip_prefix("objective value:")
            .or_else(|| line.strip_prefix("objective value ="))
        {
            objective = rest.trim().parse::<f64>().ok();
            continue;
        }

        let mut it = line.split_whitespace();
        let Some(name) = it.next() else { continue };
        let Some(val) = it.next() else { continue };
        if let Ok(v) = val.parse::<f64>() {
            assignments.insert(name.to_string(), v);
        }
    }

    let Some(status_line) = status_line else {
        return Err(SolveError::Parse("missing `solution status:` line".into()));
    };
    let status = if status_line.contains("infeasible") {
        SolveStatus::Infeasible
    } else if no_solution {
        return Err(SolveError::NoIncumbent(status_line));
    } else if status_line.contains("optimal") {
        SolveStatus::Optimal
    } else {
        SolveStatus::Limited
    };

    Ok(ParsedSolution {
        status,
        objective,
        assignments,
    })
}
