//! Split an alignment into fixed and variable columns and one-hot encode
//! the targets at the variable ones.

use crate::alignment::Alignment;
use crate::alphabet::{symbol_index, N_SYMBOLS};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("alignment contains no sequences")]
    Empty,
    #[error("sequence `{id}` has length {found}, expected {expected}")]
    Ragged {
        id: String,
        expected: usize,
        found: usize,
    },
    #[error("sequence `{id}` has residue `{residue}` at column {column}, outside the amino acid alphabet")]
    UnknownResidue {
        id: String,
        column: usize,
        residue: char,
    },
}

/// Targets projected onto the variable columns.
///
/// The one-hot tensor `O[i][p, a]` is stored as the alphabet index of target
/// `i` at variable position `p`; [`EncodedTargets::onehot`] gives the dense view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTargets {
    pub fixed_positions: BTreeMap<usize, char>,
    pub variable_positions: Vec<usize>,
    pub sequences: Vec<String>,
    residues: Vec<Vec<usize>>,
}

impl EncodedTargets {
    pub fn n_targets(&self) -> usize {
        self.sequences.len()
    }

    pub fn n_var_pos(&self) -> usize {
        self.variable_positions.len()
    }

    /// Full alignment width.
    pub fn width(&self) -> usize {
        self.fixed_positions.len() + self.variable_positions.len()
    }

    /// Alphabet column of target `i` at variable position `p`.
    pub fn residue(&self, i: usize, p: usize) -> usize {
        self.residues[i][p]
    }

    pub fn onehot(&self, i: usize) -> Vec<[bool; N_SYMBOLS]> {
        self.residues[i]
            .iter()
            .map(|&a| {
                let mut row = [false; N_SYMBOLS];
                row[a] = true;
                row
            })
            .collect()
    }
}

pub fn encode(aln: &Alignment) -> Result<EncodedTargets, EncodeError> {
    let Some(first) = aln.seqs.first() else {
        return Err(EncodeError::Empty);
    };
    let width = first.len();
    for (id, seq) in aln.ids.iter().zip(&aln.seqs) {
        if seq.len() != width {
            return Err(EncodeError::Ragged {
                id: id.clone(),
                expected: width,
                found: seq.len(),
            });
        }
    }

    let mut fixed_positions = BTreeMap::new();
    let mut variable_positions = Vec::new();
    for col in 0..width {
        let r = first[col];
        if aln.seqs.iter().all(|s| s[col] == r) {
            fixed_positions.insert(col, r as char);
        } else {
            variable_positions.push(col);
        }
    }

    let mut sequences = Vec::with_capacity(aln.len());
    let mut residues = Vec::with_capacity(aln.len());
    for (id, seq) in aln.ids.iter().zip(&aln.seqs) {
        let mut projected = String::with_capacity(variable_positions.len());
        let mut row = Vec::with_capacity(variable_positions.len());
        for &col in &variable_positions {
            let r = seq[col];
            let a = symbol_index(r).ok_or_else(|| EncodeError::UnknownResidue {
                id: id.clone(),
                column: col,
                residue: r as char,
            })?;
            projected.push(r as char);
            row.push(a);
        }
        sequences.push(projected);
        residues.push(row);
    }

    tracing::debug!(
        "encoded {} targets: {} fixed, {} variable positions",
        sequences.len(),
        fixed_positions.len(),
        variable_positions.len()
    );

    Ok(EncodedTargets {
        fixed_positions,
        variable_positions,
        sequences,
        residues,
    })
}
