//! Residue alphabet shared by every coverage vector and matrix.

/// 20 standard amino acids, stop and gap. The index of a symbol in this
/// array is its column in every coverage/count row.
pub const SYMBOLS: [u8; N_SYMBOLS] = *b"ACDEFGHIKLMNPQRSTVWY*-";

pub const N_SYMBOLS: usize = 22;

pub const STOP: u8 = b'*';
pub const GAP: u8 = b'-';

/// The 20 residues used when generating synthetic targets.
pub const STANDARD_AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

/// Column of `residue` in [`SYMBOLS`], if it belongs to the alphabet.
#[inline]
pub fn symbol_index(residue: u8) -> Option<usize> {
    SYMBOLS.iter().position(|&s| s == residue)
}

#[inline]
pub fn symbol(idx: usize) -> char {
    SYMBOLS[idx] as char
}
