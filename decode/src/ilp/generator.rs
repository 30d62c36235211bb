use crate::codon_table::CodonTable;
use crate::encoder::EncodedTargets;
use crate::ilp::linear::{Constraint, Ilp, LinearExpr, ObjSense, Sense};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dimensions of the model and the naming scheme of its variables.
///
/// - `t_{i}`: target `i` is covered
/// - `G_{s}_{p}_{c}`: sub-library `s` uses codon class `c` at variable position `p`
/// - `B_{i}_{s}`: target `i` is fully matched by sub-library `s`
/// - `bin_{s}_{k}`: log-size of sub-library `s` falls in bin `k`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarLayout {
    pub n_targets: usize,
    pub n_var_pos: usize,
    pub n_classes: usize,
    pub n_sublibs: usize,
    /// 0 when the exact size constraint is used.
    pub n_bins: usize,
}

impl VarLayout {
    pub fn target(&self, i: usize) -> String {
        format!("t_{i}")
    }

    pub fn codon(&self, s: usize, p: usize, c: usize) -> String {
        format!("G_{s}_{p}_{c}")
    }

    pub fn matched(&self, i: usize, s: usize) -> String {
        format!("B_{i}_{s}")
    }

    pub fn bin(&self, s: usize, k: usize) -> String {
        format!("bin_{s}_{k}")
    }

    pub fn codon_row(&self, s: usize, p: usize) -> Vec<String> {
        (0..self.n_classes).map(|c| self.codon(s, p, c)).collect()
    }

    /// Chosen class per (sub-library, position): arg-max of the one-hot row,
    /// first index on ties.
    pub fn selection(&self, assignment: &HashMap<String, f64>) -> Vec<Vec<usize>> {
        (0..self.n_sublibs)
            .map(|s| {
                (0..self.n_var_pos)
                    .map(|p| {
                        let row = (0..self.n_classes)
                            .map(|c| assignment.get(&self.codon(s, p, c)).copied().unwrap_or(0.0));
                        argmax(row)
                    })
                    .collect()
            })
            .collect()
    }

    /// `t` rounded to booleans.
    pub fn coverage(&self, assignment: &HashMap<String, f64>) -> Vec<bool> {
        (0..self.n_targets)
            .map(|i| assignment.get(&self.target(i)).copied().unwrap_or(0.0) > 0.5)
            .collect()
    }

    /// Active bin per sub-library, `None` without binning.
    pub fn selected_bins(&self, assignment: &HashMap<String, f64>) -> Vec<Option<usize>> {
        (0..self.n_sublibs)
            .map(|s| {
                (0..self.n_bins).find(|&k| assignment.get(&self.bin(s, k)).copied().unwrap_or(0.0) > 0.5)
            })
            .collect()
    }
}

fn argmax<I: Iterator<Item = f64>>(row: I) -> usize {
    let mut best = 0;
    let mut best_v = f64::NEG_INFINITY;
    for (idx, v) in row.enumerate() {
        if v > best_v {
            best = idx;
            best_v = v;
        }
    }
    best
}

/// Accumulates the constraints of one library model.
pub(crate) struct Generator<'a> {
    pub(crate) targets: &'a EncodedTargets,
    pub(crate) table: &'a CodonTable,
    pub(crate) layout: VarLayout,
    pub(crate) ilp: Ilp,
    cst_id: usize,
}

impl<'a> Generator<'a> {
    pub(crate) fn new(targets: &'a EncodedTargets, table: &'a CodonTable, layout: VarLayout) -> Self {
        Self {
            targets,
            table,
            layout,
            ilp: Ilp::new(),
            cst_id: 0,
        }
    }

    pub(crate) fn next_cst_id(&mut self) -> usize {
        let n = self.cst_id;
        self.cst_id += 1;
        n
    }

    /// Append a constraint. A constraint without variables is dropped when it
    /// holds trivially and kept otherwise, so the solver reports infeasibility.
    pub(crate) fn push(&mut self, c: Constraint) {
        if c.expr.terms.is_empty() && c.is_satisfied(&HashMap::new(), 1e-9) {
            return;
        }
        self.ilp.constraints.push(c);
    }

    pub(crate) fn declare_binaries(&mut self) {
        let l = self.layout.clone();
        for i in 0..l.n_targets {
            self.ilp.binaries.insert(l.target(i));
            for s in 0..l.n_sublibs {
                self.ilp.binaries.insert(l.matched(i, s));
            }
        }
        for s in 0..l.n_sublibs {
            for p in 0..l.n_var_pos {
                self.ilp.binaries.extend(l.codon_row(s, p));
            }
            for k in 0..l.n_bins {
                self.ilp.binaries.insert(l.bin(s, k));
            }
        }
    }

    /// Exactly one codon class per position of every sub-library.
    pub(crate) fn emit_one_codon_per_position(&mut self) {
        for s in 0..self.layout.n_sublibs {
            for p in 0..self.layout.n_var_pos {
                let row = self.layout.codon_row(s, p);
                self.push(Constraint {
                    name: format!("onecodon_{s}_{p}"),
                    expr: LinearExpr::sum(&row),
                    sense: Sense::Eq,
                    rhs: 1.0,
                });
            }
        }
    }

    /// `C[s][p, a] = sum_c G[s][p, c] * coverage[c][a]`: 1 iff the codon
    /// chosen at `p` reaches residue `a`.
    pub(crate) fn reach_expr(&self, s: usize, p: usize, a: usize) -> LinearExpr {
        let mut e = LinearExpr::zero();
        for (c, class) in self.table.classes().iter().enumerate() {
            if class.coverage[a] {
                e.add_term(&self.layout.codon(s, p, c), 1.0);
            }
        }
        e
    }

    /// `sum(O[i] * C[s])`: positions where sub-library `s` can produce target `i`.
    pub(crate) fn match_count_expr(&self, i: usize, s: usize) -> LinearExpr {
        let mut e = LinearExpr::zero();
        for p in 0..self.layout.n_var_pos {
            e.add_inplace(&self.reach_expr(s, p, self.targets.residue(i, p)));
        }
        e
    }

    pub(crate) fn emit_objective(&mut self) {
        self.ilp.sense = ObjSense::Maximize;
        let ts: Vec<String> = (0..self.layout.n_targets).map(|i| self.layout.target(i)).collect();
        self.ilp.objective = LinearExpr::sum(&ts);
    }

    pub(crate) fn finish(mut self) -> (Ilp, VarLayout) {
        self.ilp.normalize();
        (self.ilp, self.layout)
    }
}
