//! Big-M lowering of the coverage logic.

use crate::ilp::generator::Generator;
use crate::ilp::linear::{Constraint, LinearExpr, Sense};

/// `indicator -> (matches == n)` for an integer expression `matches` in `[0, n]`.
///
/// `0 <= matches - n + n * (1 - indicator) <= n`
///
/// With `indicator = 1` the lower bound forces `matches >= n`; with
/// `indicator = 0` both bounds hold for any `matches` in range.
pub fn all_match(name: &str, matches: &LinearExpr, n: usize, indicator: &str) -> [Constraint; 2] {
    let big_m = n as f64;
    // matches - n + n * (1 - b) == matches - n * b
    let mut expr = matches.clone();
    expr.add_term(indicator, -big_m);
    [
        Constraint {
            name: format!("{name}_lo"),
            expr: expr.clone(),
            sense: Sense::Ge,
            rhs: 0.0,
        },
        Constraint {
            name: format!("{name}_hi"),
            expr,
            sense: Sense::Le,
            rhs: big_m,
        },
    ]
}

/// `indicator == OR(terms)` over binary `terms`.
///
/// `0 <= -sum(terms) + (k + 1) * indicator <= k` with `k = terms.len()`.
pub fn any_match(name: &str, terms: &[String], indicator: &str) -> [Constraint; 2] {
    let k = terms.len() as f64;
    let mut expr = LinearExpr::sum(terms).scale(-1.0);
    expr.add_term(indicator, k + 1.0);
    [
        Constraint {
            name: format!("{name}_lo"),
            expr: expr.clone(),
            sense: Sense::Ge,
            rhs: 0.0,
        },
        Constraint {
            name: format!("{name}_hi"),
            expr,
            sense: Sense::Le,
            rhs: k,
        },
    ]
}

impl Generator<'_> {
    /// `B[i, s] = 1` only if sub-library `s` reaches target `i` at every variable position.
    pub(crate) fn emit_and_constraints(&mut self) {
        let n = self.layout.n_var_pos;
        for i in 0..self.layout.n_targets {
            for s in 0..self.layout.n_sublibs {
                let matches = self.match_count_expr(i, s);
                let b = self.layout.matched(i, s);
                let cid = self.next_cst_id();
                for c in all_match(&format!("and_{i}_{s}_{cid}"), &matches, n, &b) {
                    self.push(c);
                }
            }
        }
    }

    /// `t[i] = 1` iff some sub-library matches target `i`.
    pub(crate) fn emit_or_constraints(&mut self) {
        for i in 0..self.layout.n_targets {
            let terms: Vec<String> = (0..self.layout.n_sublibs)
                .map(|s| self.layout.matched(i, s))
                .collect();
            let t = self.layout.target(i);
            let cid = self.next_cst_id();
            for c in any_match(&format!("or_{i}_{cid}"), &terms, &t) {
                self.push(c);
            }
        }
    }
}
