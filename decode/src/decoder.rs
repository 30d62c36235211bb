//! Turn solved codon choices back into a library description and its
//! statistics.

use crate::alphabet::GAP;
use crate::codon_table::{CodonClass, CodonTable};
use crate::ilp::VarLayout;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("sub-library {sublib} has {found} positions, expected {expected}")]
    Shape {
        sublib: usize,
        expected: usize,
        found: usize,
    },
    #[error("codon class {0} is not in the codon table")]
    UnknownClass(usize),
    #[error("library width {width} does not fit {n_fixed} fixed and {n_var} variable positions")]
    Width {
        width: usize,
        n_fixed: usize,
        n_var: usize,
    },
}

/// One rendered position of a sub-library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryToken {
    Residue(char),
    /// `"C/D/G/Y" -> ["KRT"]`: reachable residues and the codon alternatives.
    Degenerate(BTreeMap<String, Vec<String>>),
}

/// Chosen codon class per (sub-library, variable position).
pub struct Decoder<'a> {
    table: &'a CodonTable,
    selection: Vec<Vec<usize>>,
}

impl<'a> Decoder<'a> {
    pub fn new(table: &'a CodonTable, selection: Vec<Vec<usize>>) -> Result<Self, DecodeError> {
        let expected = selection.first().map_or(0, Vec::len);
        for (s, row) in selection.iter().enumerate() {
            if row.len() != expected {
                return Err(DecodeError::Shape {
                    sublib: s,
                    expected,
                    found: row.len(),
                });
            }
            if let Some(&c) = row.iter().find(|&&c| c >= table.len()) {
                return Err(DecodeError::UnknownClass(c));
            }
        }
        Ok(Self { table, selection })
    }

    /// Read `G` from solver assignments.
    pub fn from_assignments(
        table: &'a CodonTable,
        layout: &VarLayout,
        assignments: &HashMap<String, f64>,
    ) -> Result<Self, DecodeError> {
        Self::new(table, layout.selection(assignments))
    }

    pub fn selection(&self) -> &[Vec<usize>] {
        &self.selection
    }

    fn class(&self, s: usize, p: usize) -> &CodonClass {
        self.table.class(self.selection[s][p])
    }

    /// Minimal codons chosen per sub-library and position.
    pub fn codons(&self) -> Vec<Vec<Vec<String>>> {
        self.selection
            .iter()
            .map(|row| row.iter().map(|&c| self.table.class(c).codons.clone()).collect())
            .collect()
    }

    /// Distinct protein sequences in sub-library `s`.
    pub fn sublib_size(&self, s: usize) -> u64 {
        (0..self.selection[s].len())
            .map(|p| self.class(s, p).counts.distinct() as u64)
            .fold(1u64, u64::saturating_mul)
    }

    /// Sum of the sub-library sizes, the exact achieved size.
    pub fn total_lib_size(&self) -> u64 {
        (0..self.selection.len())
            .map(|s| self.sublib_size(s))
            .fold(0u64, u64::saturating_add)
    }

    /// Chance that a uniform draw from the pooled library is `seq` (projected
    /// to the variable positions). A sequence of the wrong length is never
    /// drawn and gets 0.
    pub fn seq_probability(&self, seq: &str) -> f64 {
        let n_var = self.selection.first().map_or(0, Vec::len);
        if seq.len() != n_var {
            return 0.0;
        }
        let mut hits = 0.0;
        let mut total = 0.0;
        for row in &self.selection {
            let mut p_hit = 1.0;
            let mut n_seq = 1.0;
            for (&c, residue) in row.iter().zip(seq.bytes()) {
                let counts = &self.table.class(c).counts;
                p_hit *= f64::from(counts.get(residue));
                n_seq *= f64::from(counts.total());
            }
            hits += p_hit;
            total += n_seq;
        }
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }

    /// Sum of [`Decoder::seq_probability`] over all targets; lies in `[0, n_targets]`.
    pub fn on_target_probability<S: AsRef<str>>(&self, seqs: &[S]) -> f64 {
        seqs.iter().map(|s| self.seq_probability(s.as_ref())).sum()
    }

    pub fn in_library(&self, seq: &str) -> bool {
        self.seq_probability(seq) > 0.0
    }

    /// Render each sub-library over the full alignment width. Gap positions
    /// are dropped.
    pub fn parse_lib(
        &self,
        width: usize,
        fixed_positions: &BTreeMap<usize, char>,
    ) -> Result<Vec<Vec<LibraryToken>>, DecodeError> {
        let n_var = self.selection.first().map_or(0, Vec::len);
        if fixed_positions.len() + n_var != width {
            return Err(DecodeError::Width {
                width,
                n_fixed: fixed_positions.len(),
                n_var,
            });
        }

        let mut lib = Vec::with_capacity(self.selection.len());
        for s in 0..self.selection.len() {
            let mut tokens = Vec::with_capacity(width);
            let mut p = 0;
            for col in 0..width {
                let token = if let Some(&r) = fixed_positions.get(&col) {
                    LibraryToken::Residue(r)
                } else {
                    let class = self.class(s, p);
                    p += 1;
                    match class.counts.sole_residue() {
                        Some(r) => LibraryToken::Residue(r as char),
                        None => {
                            let key = class.counts.residues().map(String::from).collect::<Vec<_>>().join("/");
                            LibraryToken::Degenerate(BTreeMap::from([(key, class.codons.clone())]))
                        }
                    }
                };
                if token != LibraryToken::Residue(GAP as char) {
                    tokens.push(token);
                }
            }
            lib.push(tokens);
        }
        Ok(lib)
    }
}
