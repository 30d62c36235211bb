//! Multiple sequence alignment input (Clustal or aligned FASTA).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("failed to read alignment: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed FASTA record: {0}")]
    Fasta(String),
    #[error("line {0}: expected `<id> <residues>` in Clustal block")]
    MalformedClustal(usize),
    #[error("alignment contains no sequences")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentFormat {
    #[default]
    Clustal,
    Fasta,
}

impl std::str::FromStr for AlignmentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clustal" | "aln" => Ok(Self::Clustal),
            "fasta" | "fa" => Ok(Self::Fasta),
            other => Err(format!("unknown alignment format `{other}`")),
        }
    }
}

/// Aligned sequences in file order. Lengths are not validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub ids: Vec<String>,
    pub seqs: Vec<Vec<u8>>,
}

impl Alignment {
    /// Unnamed alignment, ids `Seq0..`.
    pub fn from_sequences<S: AsRef<[u8]>>(seqs: &[S]) -> Self {
        Self {
            ids: (0..seqs.len()).map(|i| format!("Seq{i}")).collect(),
            seqs: seqs.iter().map(|s| s.as_ref().to_ascii_uppercase()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn read(path: &Path, format: AlignmentFormat) -> Result<Self, AlignmentError> {
        let text = std::fs::read_to_string(path)?;
        let aln = match format {
            AlignmentFormat::Clustal => parse_clustal(&text)?,
            AlignmentFormat::Fasta => parse_fasta(text.as_bytes())?,
        };
        tracing::debug!("read {} aligned sequences from {}", aln.len(), path.display());
        Ok(aln)
    }
}

pub fn parse_fasta<R: std::io::Read>(reader: R) -> Result<Alignment, AlignmentError> {
    let mut aln = Alignment::default();
    for rec in bio::io::fasta::Reader::new(reader).records() {
        let rec = rec.map_err(|e| AlignmentError::Fasta(e.to_string()))?;
        aln.ids.push(rec.id().to_string());
        aln.seqs.push(rec.seq().to_ascii_uppercase());
    }
    if aln.is_empty() {
        return Err(AlignmentError::Empty);
    }
    Ok(aln)
}

/// Clustal W/Omega: a `CLUSTAL` header, then blocks of `<id> <residues> [count]`
/// lines; conservation lines (leading whitespace) and blank lines are skipped.
pub fn parse_clustal(text: &str) -> Result<Alignment, AlignmentError> {
    let mut aln = Alignment::default();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty()
            || line.starts_with(char::is_whitespace)
            || line.starts_with("CLUSTAL")
            || line.starts_with("MUSCLE")
        {
            continue;
        }
        let mut it = line.split_whitespace();
        let (Some(id), Some(chunk)) = (it.next(), it.next()) else {
            return Err(AlignmentError::MalformedClustal(lineno + 1));
        };
        let idx = *slot.entry(id.to_string()).or_insert_with(|| {
            aln.ids.push(id.to_string());
            aln.seqs.push(Vec::new());
            aln.ids.len() - 1
        });
        aln.seqs[idx].extend(chunk.bytes().map(|b| b.to_ascii_uppercase()));
    }
    if aln.is_empty() {
        return Err(AlignmentError::Empty);
    }
    Ok(aln)
}
