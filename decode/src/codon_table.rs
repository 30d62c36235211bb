//! Degenerate codon table.
//!
//! Every 3-mer over the 15 IUPAC nucleotide codes is expanded into its
//! unambiguous triplets and translated with the standard genetic code.
//! Codons reaching the same set of residues are interchangeable for the
//! model, so they are grouped into equivalence classes and each class keeps
//! only its least degenerate members.

use crate::alphabet::{symbol, symbol_index, GAP, N_SYMBOLS, SYMBOLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// IUPAC nucleotide codes in enumeration order.
pub const NUCLEOTIDE_CODES: [(u8, &[u8]); 15] = [
    (b'A', b"A"),
    (b'C', b"C"),
    (b'G', b"G"),
    (b'T', b"T"),
    (b'W', b"AT"),
    (b'S', b"CG"),
    (b'M', b"AC"),
    (b'K', b"GT"),
    (b'R', b"AG"),
    (b'Y', b"CT"),
    (b'B', b"CGT"),
    (b'D', b"AGT"),
    (b'H', b"ACT"),
    (b'V', b"ACG"),
    (b'N', b"ACGT"),
];

/// Synthetic codon standing for "position absent from this sub-library".
pub const GAP_CODON: &str = "___";

// Standard code, first/second/third base each in TCAG order.
const STANDARD_CODE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Residues reachable by a codon, ignoring multiplicity.
pub type Coverage = [bool; N_SYMBOLS];

/// Residue multiset produced by a degenerate codon, indexed like [`SYMBOLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidueCounts([u32; N_SYMBOLS]);

impl ResidueCounts {
    pub fn zero() -> Self {
        Self([0; N_SYMBOLS])
    }

    fn add(&mut self, residue: u8) {
        if let Some(idx) = symbol_index(residue) {
            self.0[idx] += 1;
        }
    }

    /// Number of triplets yielding `residue` (0 for symbols outside the alphabet).
    pub fn get(&self, residue: u8) -> u32 {
        symbol_index(residue).map_or(0, |idx| self.0[idx])
    }

    pub fn at(&self, idx: usize) -> u32 {
        self.0[idx]
    }

    /// Total number of unambiguous triplets.
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Number of distinct residues.
    pub fn distinct(&self) -> usize {
        self.0.iter().filter(|&&c| c > 0).count()
    }

    pub fn coverage(&self) -> Coverage {
        let mut cov = [false; N_SYMBOLS];
        for (slot, &c) in cov.iter_mut().zip(self.0.iter()) {
            *slot = c > 0;
        }
        cov
    }

    /// Reachable residues in alphabet order.
    pub fn residues(&self) -> impl Iterator<Item = char> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(idx, _)| symbol(idx))
    }

    /// The residue, when exactly one is reachable.
    pub fn sole_residue(&self) -> Option<u8> {
        let mut it = self.0.iter().enumerate().filter(|(_, &c)| c > 0);
        match (it.next(), it.next()) {
            (Some((idx, _)), None) => Some(SYMBOLS[idx]),
            _ => None,
        }
    }
}

/// Nucleotides represented by an IUPAC code.
pub fn expand_code(code: u8) -> Option<&'static [u8]> {
    NUCLEOTIDE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, nts)| *nts)
}

fn base_rank(nt: u8) -> Option<usize> {
    match nt {
        b'T' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

/// Translate one unambiguous triplet with the standard genetic code.
pub fn translate(triplet: [u8; 3]) -> Option<u8> {
    let idx = base_rank(triplet[0])? * 16 + base_rank(triplet[1])? * 4 + base_rank(triplet[2])?;
    Some(STANDARD_CODE[idx])
}

/// Product of the per-position ambiguity set sizes. The gap codon counts as 1.
pub fn degeneracy(codon: &str) -> Option<u32> {
    if codon == GAP_CODON {
        return Some(1);
    }
    let bytes = codon.as_bytes();
    if bytes.len() != 3 {
        return None;
    }
    let mut d = 1;
    for &code in bytes {
        d *= expand_code(code)?.len() as u32;
    }
    Some(d)
}

/// Expand a degenerate codon and tally the residues it can produce.
pub fn residue_counts(codon: &str) -> Option<ResidueCounts> {
    let mut counts = ResidueCounts::zero();
    if codon == GAP_CODON {
        counts.add(GAP);
        return Some(counts);
    }
    let bytes = codon.as_bytes();
    if bytes.len() != 3 {
        return None;
    }
    let (a, b, c) = (
        expand_code(bytes[0])?,
        expand_code(bytes[1])?,
        expand_code(bytes[2])?,
    );
    for &x in a {
        for &y in b {
            for &z in c {
                counts.add(translate([x, y, z])?);
            }
        }
    }
    Some(counts)
}

/// All 15^3 degenerate codons in enumeration order.
pub fn enumerate_codons() -> Vec<String> {
    let mut out = Vec::with_capacity(NUCLEOTIDE_CODES.len().pow(3));
    for (a, _) in NUCLEOTIDE_CODES {
        for (b, _) in NUCLEOTIDE_CODES {
            for (c, _) in NUCLEOTIDE_CODES {
                out.push(String::from_utf8_lossy(&[a, b, c]).into_owned());
            }
        }
    }
    out
}

/// One equivalence class of codons sharing a coverage pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodonClass {
    pub coverage: Coverage,
    /// Counts of the first minimal codon.
    pub counts: ResidueCounts,
    /// Every codon of minimal degeneracy in the class.
    pub codons: Vec<String>,
    pub degeneracy: u32,
}

impl CodonClass {
    /// Triplets synthesized for this class; the model's size coefficient.
    pub fn size(&self) -> u32 {
        self.counts.total()
    }

    pub fn representative(&self) -> &str {
        &self.codons[0]
    }
}

/// Reduced codon table: one row per equivalence class plus the full
/// codon -> residue distribution mapping. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodonTable {
    classes: Vec<CodonClass>,
    mapping: BTreeMap<String, ResidueCounts>,
}

impl CodonTable {
    pub fn build() -> Self {
        let mut mapping: BTreeMap<String, ResidueCounts> = BTreeMap::new();
        // coverage -> codons in enumeration order
        let mut groups: BTreeMap<Coverage, Vec<(String, u32)>> = BTreeMap::new();

        let mut codons = enumerate_codons();
        codons.push(GAP_CODON.to_string());
        for codon in codons {
            let (Some(counts), Some(deg)) = (residue_counts(&codon), degeneracy(&codon)) else {
                continue;
            };
            groups
                .entry(counts.coverage())
                .or_default()
                .push((codon.clone(), deg));
            mapping.insert(codon, counts);
        }

        let mut classes = Vec::with_capacity(groups.len());
        for (coverage, members) in groups {
            let min_deg = members.iter().map(|(_, d)| *d).min().unwrap_or(1);
            let minimal: Vec<String> = members
                .into_iter()
                .filter(|(_, d)| *d == min_deg)
                .map(|(c, _)| c)
                .collect();
            let Some(counts) = minimal.first().and_then(|c| mapping.get(c)).copied() else {
                continue;
            };
            classes.push(CodonClass {
                coverage,
                counts,
                codons: minimal,
                degeneracy: min_deg,
            });
        }

        tracing::debug!(
            "codon table: {} codons, {} equivalence classes",
            mapping.len(),
            classes.len()
        );
        Self { classes, mapping }
    }

    /// Process-wide table for the standard genetic code, built on first use.
    pub fn standard() -> &'static CodonTable {
        static TABLE: OnceLock<CodonTable> = OnceLock::new();
        TABLE.get_or_init(CodonTable::build)
    }

    pub fn classes(&self) -> &[CodonClass] {
        &self.classes
    }

    pub fn class(&self, idx: usize) -> &CodonClass {
        &self.classes[idx]
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Binary reachability matrix (class x residue).
    pub fn coverage_matrix(&self) -> Vec<Coverage> {
        self.classes.iter().map(|c| c.coverage).collect()
    }

    /// Weighted count matrix (class x residue).
    pub fn count_matrix(&self) -> Vec<ResidueCounts> {
        self.classes.iter().map(|c| c.counts).collect()
    }

    /// Residue distribution of any degenerate codon.
    pub fn distribution(&self, codon: &str) -> Option<&ResidueCounts> {
        self.mapping.get(codon)
    }

    /// Index of the class reaching exactly `residues`.
    pub fn class_for(&self, residues: &[u8]) -> Option<usize> {
        let mut cov = [false; N_SYMBOLS];
        for &r in residues {
            cov[symbol_index(r)?] = true;
        }
        self.classes.iter().position(|c| c.coverage == cov)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_translate_standard_code() {
        assert_eq!(translate(*b"ATG"), Some(b'M'));
        assert_eq!(translate(*b"TGG"), Some(b'W'));
        assert_eq!(translate(*b"TAA"), Some(b'*'));
        assert_eq!(translate(*b"GGC"), Some(b'G'));
        assert_eq!(translate(*b"NNN"), None);
    }

    #[test]
    fn test_degeneracy_is_product_of_set_sizes() {
        assert_eq!(degeneracy("ATG"), Some(1));
        assert_eq!(degeneracy("NNK"), Some(32));
        assert_eq!(degeneracy("NNN"), Some(64));
        assert_eq!(degeneracy("BDH"), Some(27));
        assert_eq!(degeneracy(GAP_CODON), Some(1));
        assert_eq!(degeneracy("AT"), None);
        for codon in enumerate_codons() {
            let expected: u32 = codon
                .bytes()
                .map(|b| expand_code(b).map_or(0, |s| s.len() as u32))
                .product();
            assert_eq!(degeneracy(&codon), Some(expected));
            assert_eq!(residue_counts(&codon).map(|c| c.total()), Some(expected));
        }
    }

    #[test]
    fn test_nnk_counts() {
        let counts = residue_counts("NNK").unwrap();
        assert_eq!(counts.total(), 32);
        // NNK reaches all 20 residues and the amber stop
        assert_eq!(counts.distinct(), 21);
        assert_eq!(counts.get(b'L'), 3);
        assert_eq!(counts.get(b'*'), 1);
        assert_eq!(counts.get(b'-'), 0);
    }

    #[test]
    fn test_one_row_per_coverage_pattern() {
        let table = CodonTable::build();
        assert_eq!(enumerate_codons().len(), 3375);
        let mut seen = std::collections::HashSet::new();
        for class in table.classes() {
            assert!(seen.insert(class.coverage));
            assert_eq!(class.counts.coverage(), class.coverage);
        }
    }

    #[test]
    fn test_representatives_have_minimal_degeneracy() {
        let table = CodonTable::build();
        let mut best: HashMap<Coverage, u32> = HashMap::new();
        for codon in enumerate_codons() {
            let cov = residue_counts(&codon).unwrap().coverage();
            let d = degeneracy(&codon).unwrap();
            let e = best.entry(cov).or_insert(d);
            *e = (*e).min(d);
        }
        for class in table.classes() {
            for codon in &class.codons {
                assert_eq!(degeneracy(codon), Some(class.degeneracy));
                assert_eq!(
                    table.distribution(codon).map(|c| c.coverage()),
                    Some(class.coverage)
                );
            }
            if class.codons[0] != GAP_CODON {
                assert_eq!(best[&class.coverage], class.degeneracy);
            }
        }
    }

    #[test]
    fn test_ties_are_kept() {
        let table = CodonTable::build();
        let cys = table.class_for(b"C").unwrap();
        assert_eq!(table.class(cys).codons, vec!["TGC", "TGT"]);
        let met = table.class_for(b"M").unwrap();
        assert_eq!(table.class(met).codons, vec!["ATG"]);
        let gap = table.class_for(b"-").unwrap();
        assert_eq!(table.class(gap).codons, vec![GAP_CODON]);
        assert_eq!(table.class(gap).size(), 1);
    }

    #[test]
    fn test_json_roundtrip_preserves_classes() {
        let table = CodonTable::standard();
        let loaded = CodonTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(loaded.len(), table.len());
        assert_eq!(loaded.classes(), table.classes());
        assert_eq!(loaded.distribution("NNK"), table.distribution("NNK"));
        assert_eq!(loaded.class_for(b"C"), table.class_for(b"C"));
        assert!(CodonTable::from_json("{\"classes\": 3}").is_err());
    }

    #[test]
    fn test_sole_residue() {
        let table = CodonTable::standard();
        assert_eq!(table.distribution("ATG").unwrap().sole_residue(), Some(b'M'));
        assert_eq!(table.distribution("NNK").unwrap().sole_residue(), None);
        let residues: String = table.distribution("TGY").unwrap().residues().collect();
        assert_eq!(residues, "C");
    }
}
