//! Synthetic target sets: random point-mutant families of a random wild type.

use crate::alphabet::STANDARD_AMINO_ACIDS;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimulateError {
    #[error("cannot draw {count} distinct sequences of length {length}")]
    TooMany { count: usize, length: usize },
    #[error("invalid position weights: {0}")]
    Weights(String),
}

/// `count` distinct sequences of `length` residues. Each new sequence is a
/// single point mutant of one already drawn; mutated positions follow
/// exponentially distributed weights.
pub fn generate_targets<R: Rng + ?Sized>(
    count: usize,
    length: usize,
    rng: &mut R,
) -> Result<Vec<String>, SimulateError> {
    let max_distinct = (0..length).fold(1usize, |acc, _| acc.saturating_mul(STANDARD_AMINO_ACIDS.len()));
    if count > max_distinct || length == 0 {
        return Err(SimulateError::TooMany { count, length });
    }

    let weights: Vec<f64> = (0..length).map(|_| -(1.0 - rng.gen::<f64>()).ln()).collect();
    let total: f64 = weights.iter().sum();
    let positions = WeightedIndex::new(weights.iter().map(|w| w / total))
        .map_err(|e| SimulateError::Weights(e.to_string()))?;

    let wt: Vec<u8> = (0..length)
        .map(|_| *STANDARD_AMINO_ACIDS.choose(rng).unwrap_or(&b'A'))
        .collect();
    let mut seqs = vec![wt.clone()];
    let mut seen: HashSet<Vec<u8>> = HashSet::from([wt]);

    while seqs.len() < count {
        let Some(parent) = seqs.choose(rng) else { break };
        let mut child = parent.clone();
        child[positions.sample(rng)] = *STANDARD_AMINO_ACIDS.choose(rng).unwrap_or(&b'A');
        if seen.insert(child.clone()) {
            seqs.push(child);
        }
    }

    Ok(seqs
        .into_iter()
        .map(|s| String::from_utf8_lossy(&s).into_owned())
        .collect())
}

pub fn to_fasta<S: AsRef<str>>(seqs: &[S]) -> String {
    let mut out = String::new();
    for (i, s) in seqs.iter().enumerate() {
        out.push_str(&format!(">Seq{i}\n{}\n", s.as_ref()));
    }
    out
}
