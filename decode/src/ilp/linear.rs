use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ObjSense {
    Minimize,
    Maximize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: BTreeMap<String, f64>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    /// `sum(vars)` with unit coefficients.
    pub fn sum<'a, I: IntoIterator<Item = &'a String>>(vars: I) -> Self {
        let mut e = Self::zero();
        for v in vars {
            e.add_term(v, 1.0);
        }
        e
    }

    pub fn add_term(&mut self, v: &str, c: f64) {
        if c == 0.0 {
            return;
        }
        let slot = self.terms.entry(v.to_string()).or_insert(0.0);
        *slot += c;
        if slot.abs() <= 1e-12 {
            self.terms.remove(v);
        }
    }

    pub fn add_inplace(&mut self, other: &LinearExpr) {
        self.constant += other.constant;
        for (k, v) in other.terms.iter() {
            *self.terms.entry(k.clone()).or_insert(0.0) += *v;
        }
        self.terms.retain(|_, c| c.abs() > 1e-12);
    }

    pub fn sub_inplace(&mut self, other: &LinearExpr) {
        self.constant -= other.constant;
        for (k, v) in other.terms.iter() {
            *self.terms.entry(k.clone()).or_insert(0.0) -= *v;
        }
        self.terms.retain(|_, c| c.abs() > 1e-12);
    }

    pub fn scale(&self, k: f64) -> Self {
        let mut e = Self::zero();
        e.constant = self.constant * k;
        for (n, c) in self.terms.iter() {
            e.terms.insert(n.clone(), c * k);
        }
        e
    }

    pub fn sub(mut self, other: LinearExpr) -> LinearExpr {
        self.sub_inplace(&other);
        self
    }

    /// Value under `assignment`; missing variables read as 0.
    pub fn eval(&self, assignment: &HashMap<String, f64>) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(n, c)| c * assignment.get(n).copied().unwrap_or(0.0))
                .sum::<f64>()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

#[derive(Clone, Debug)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr, // lhs
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn is_satisfied(&self, assignment: &HashMap<String, f64>, tol: f64) -> bool {
        let lhs = self.expr.eval(assignment);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tol,
            Sense::Ge => lhs >= self.rhs - tol,
            Sense::Eq => (lhs - self.rhs).abs() <= tol,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ilp {
    pub objective: LinearExpr,
    pub sense: ObjSense,
    pub constraints: Vec<Constraint>,
    pub binaries: BTreeSet<String>,
}

impl Default for Ilp {
    fn default() -> Self {
        Self::new()
    }
}

impl Ilp {
    pub fn new() -> Self {
        Self {
            objective: LinearExpr::zero(),
            sense: ObjSense::Minimize,
            constraints: vec![],
            binaries: BTreeSet::new(),
        }
    }

    /// Move constants to the right-hand side.
    pub fn normalize(&mut self) {
        for c in self.constraints.iter_mut() {
            if c.expr.constant.abs() > 1e-12 {
                c.rhs -= c.expr.constant;
                c.expr.constant = 0.0;
            }
        }
        if self.objective.constant.abs() > 1e-12 {
            self.objective.constant = 0.0;
        }
    }

    pub fn objective_value(&self, assignment: &HashMap<String, f64>) -> f64 {
        self.objective.eval(assignment)
    }

    /// Constraints not satisfied by `assignment`, plus a non-binary value on
    /// any binary variable, reported as its name.
    pub fn violations(&self, assignment: &HashMap<String, f64>, tol: f64) -> Vec<String> {
        let mut out: Vec<String> = self
            .constraints
            .iter()
            .filter(|c| !c.is_satisfied(assignment, tol))
            .map(|c| c.name.clone())
            .collect();
        for b in &self.binaries {
            let v = assignment.get(b).copied().unwrap_or(0.0);
            if v.abs() > tol && (v - 1.0).abs() > tol {
                out.push(b.clone());
            }
        }
        out
    }

    pub fn to_lp(&self) -> String {
        emit_lp(self)
    }
}

pub fn emit_lp(ilp: &Ilp) -> String {
    let mut out = String::new();
    match ilp.sense {
        ObjSense::Minimize => out.push_str("Minimize\n obj: "),
        ObjSense::Maximize => out.push_str("Maximize\n obj: "),
    }
    out.push_str(&fmt_lin(&ilp.objective));
    out.push('\n');
    out.push_str("Subject To\n");
    for c in &ilp.constraints {
        out.push_str(&format!(
            " {}: {} {} {}\n",
            c.name,
            fmt_lin(&c.expr),
            fmt_sense(c.sense),
            fmt_num(c.rhs)
        ));
    }
    out.push_str("Binary\n");
    for b in &ilp.binaries {
        out.push_str(&format!(" {}\n", b));
    }
    out.push_str("End\n");
    out
}

fn fmt_sense(s: Sense) -> &'static str {
    match s {
        Sense::Le => "<=",
        Sense::Ge => ">=",
        Sense::Eq => "=",
    }
}

// Whole numbers print as integers while f64 still represents them exactly.
const EXACT_INT_LIMIT: f64 = 9e15;

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 && v.abs() < EXACT_INT_LIMIT {
        format!("{}", v.round() as i64)
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.9}", v)
    }
}

fn fmt_lin(e: &LinearExpr) -> String {
    let mut parts: Vec<String> = vec![];
    for (n, c) in e.terms.iter() {
        if (c - 1.0).abs() < 1e-12 {
            parts.push(format!("+1 {}", n));
        } else if (c + 1.0).abs() < 1e-12 {
            parts.push(format!("-1 {}", n));
        } else {
            parts.push(format!("{:+.9} {}", c, n));
        }
    }
    if parts.is_empty() {
        parts.push("+0".to_string());
    }
    if e.constant.abs() > 1e-12 {
        parts.push(format!("{:+.9}", e.constant));
    }
    parts.join(" ")
}
