//! Library size constraints.
//!
//! A sub-library produces `prod_p size(codon at p)` sequences. With one
//! sub-library the log of that product is linear in the codon choices and
//! can be bounded directly. A sum of products over several sub-libraries
//! cannot, so each sub-library's log-size is placed in one of a set of bins
//! and the sum of the bins' upper edges is bounded instead.

use crate::ilp::error::ModelError;
use crate::ilp::generator::Generator;
use crate::ilp::linear::{Constraint, LinearExpr, Sense};
use serde::{Deserialize, Serialize};

/// Lower edge of the first bin. The smallest sub-library has one sequence,
/// log-size 0.
pub const FIRST_BIN_LOWER: f64 = 0.0;

const EDGE_TOL: f64 = 1e-9;

/// Log-size intervals `[lower[k], upper[k]]`, consecutive and covering
/// `[0, ln(lib_limit)]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// `exp(upper[k])`, kept exact rather than recomputed.
    pub upper_sizes: Vec<f64>,
}

impl BinEdges {
    /// `min(bins, lib_limit)` bins whose upper edges are the logs of evenly
    /// spaced sizes from 1 to `lib_limit`. A single bin spans up to `lib_limit`.
    pub fn new(lib_limit: u64, bins: usize) -> Result<Self, ModelError> {
        if lib_limit == 0 {
            return Err(ModelError::InvalidLimit(lib_limit));
        }
        if bins == 0 {
            return Err(ModelError::NoBins);
        }
        let n = (bins as u64).min(lib_limit) as usize;
        if n < bins {
            tracing::info!("clamping bin count {} to library limit {}", bins, lib_limit);
        }
        let lim = lib_limit as f64;
        let upper_sizes: Vec<f64> = if n == 1 {
            vec![lim]
        } else {
            (0..n)
                .map(|k| 1.0 + (lim - 1.0) * (k as f64 / (n - 1) as f64))
                .collect()
        };
        let upper: Vec<f64> = upper_sizes.iter().map(|s| s.ln()).collect();
        let lower: Vec<f64> = (0..n)
            .map(|k| if k == 0 { FIRST_BIN_LOWER } else { upper[k - 1] })
            .collect();
        Ok(Self {
            lower,
            upper,
            upper_sizes,
        })
    }

    pub fn len(&self) -> usize {
        self.upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper.is_empty()
    }

    /// First bin containing `log_size`.
    pub fn bin_for(&self, log_size: f64) -> Option<usize> {
        (0..self.len())
            .find(|&k| self.lower[k] - EDGE_TOL <= log_size && log_size <= self.upper[k] + EDGE_TOL)
    }

    /// Size bound used in the model for the given active bins.
    pub fn upper_bound(&self, selected: &[usize]) -> f64 {
        selected.iter().map(|&k| self.upper_sizes[k]).sum()
    }
}

/// How the size budget enters the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SizeRegime {
    /// `sum_p ln(size) <= ln(lib_limit)`, exact for a single sub-library.
    Exact,
    Binned(BinEdges),
}

impl SizeRegime {
    pub fn select(
        lib_limit: u64,
        n_sublibs: usize,
        bins: usize,
        approximate: bool,
    ) -> Result<Self, ModelError> {
        if lib_limit == 0 {
            return Err(ModelError::InvalidLimit(lib_limit));
        }
        if n_sublibs == 1 && !approximate {
            tracing::info!("using exact library size");
            return Ok(Self::Exact);
        }
        let edges = BinEdges::new(lib_limit, bins)?;
        tracing::info!("using approximate library size with {} bins", edges.len());
        Ok(Self::Binned(edges))
    }

    pub fn n_bins(&self) -> usize {
        match self {
            Self::Exact => 0,
            Self::Binned(edges) => edges.len(),
        }
    }
}

impl Generator<'_> {
    /// `sum_p sum_c ln(size[c]) * G[s][p, c]`.
    pub(crate) fn log_size_expr(&self, s: usize) -> LinearExpr {
        let mut e = LinearExpr::zero();
        for p in 0..self.layout.n_var_pos {
            for (c, class) in self.table.classes().iter().enumerate() {
                let w = f64::from(class.size()).ln();
                e.add_term(&self.layout.codon(s, p, c), w);
            }
        }
        e
    }

    pub(crate) fn emit_exact_size(&mut self, lib_limit: u64) {
        for s in 0..self.layout.n_sublibs {
            let expr = self.log_size_expr(s);
            self.push(Constraint {
                name: format!("size_exact_{s}"),
                expr,
                sense: Sense::Le,
                rhs: (lib_limit as f64).ln(),
            });
        }
    }

    pub(crate) fn emit_binned_size(&mut self, lib_limit: u64, edges: &BinEdges) {
        let log_lim = (lib_limit as f64).ln();
        let mut total = LinearExpr::zero();
        for s in 0..self.layout.n_sublibs {
            let log_size = self.log_size_expr(s);
            let bins: Vec<String> = (0..edges.len()).map(|k| self.layout.bin(s, k)).collect();

            self.push(Constraint {
                name: format!("size_cap_{s}"),
                expr: log_size.clone(),
                sense: Sense::Le,
                rhs: log_lim,
            });
            self.push(Constraint {
                name: format!("bin_one_{s}"),
                expr: LinearExpr::sum(&bins),
                sense: Sense::Eq,
                rhs: 1.0,
            });

            let mut lo = LinearExpr::zero();
            let mut hi = LinearExpr::zero();
            for (k, b) in bins.iter().enumerate() {
                lo.add_term(b, edges.lower[k]);
                hi.add_term(b, edges.upper[k]);
                total.add_term(b, edges.upper_sizes[k]);
            }
            self.push(Constraint {
                name: format!("bin_lo_{s}"),
                expr: lo.sub(log_size.clone()),
                sense: Sense::Le,
                rhs: 0.0,
            });
            self.push(Constraint {
                name: format!("bin_hi_{s}"),
                expr: hi.sub(log_size),
                sense: Sense::Ge,
                rhs: 0.0,
            });
        }
        self.push(Constraint {
            name: "size_total".to_string(),
            expr: total,
            sense: Sense::Le,
            rhs: lib_limit as f64,
        });
    }
}
