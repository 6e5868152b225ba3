//! IUPAC nucleotide ambiguity codes and the position-wise matching rule.
//!
//! Each of the 15 codes stands for a set of concrete bases. A sequence base
//! matches a motif position when it belongs to that position's set, so a
//! window match is a plain per-position membership test with no backtracking.

use phf::phf_map;

/// Concrete nucleotides a sequence may contain.
pub const NUCLEOTIDES: [char; 4] = ['A', 'T', 'G', 'C'];

static IUPAC_CODES: phf::Map<char, &'static [char]> = phf_map! {
    'A' => &['A'],
    'T' => &['T'],
    'G' => &['G'],
    'C' => &['C'],
    // two-way
    'R' => &['A', 'G'],
    'Y' => &['T', 'C'],
    'S' => &['G', 'C'],
    'W' => &['A', 'T'],
    'K' => &['G', 'T'],
    'M' => &['A', 'C'],
    // three-way
    'B' => &['C', 'G', 'T'],
    'D' => &['A', 'G', 'T'],
    'H' => &['A', 'C', 'T'],
    'V' => &['A', 'C', 'G'],
    'N' => &['A', 'T', 'G', 'C'],
};

/// Read-only view over the IUPAC code table.
///
/// The table itself is built at compile time; this handle is what the scanner
/// borrows, so matching never touches process-wide mutable state.
#[derive(Debug, Clone, Copy)]
pub struct IupacCodes {
    table: &'static phf::Map<char, &'static [char]>,
}

impl Default for IupacCodes {
    fn default() -> Self {
        Self::standard()
    }
}

impl IupacCodes {
    /// The standard 15-symbol nucleotide alphabet.
    pub fn standard() -> Self {
        IupacCodes {
            table: &IUPAC_CODES,
        }
    }

    /// Number of codes in the alphabet.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True only for a table with no codes; the standard alphabet never is.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Case-insensitive membership test against the alphabet.
    pub fn is_valid_code(&self, code: char) -> bool {
        self.table.contains_key(&code.to_ascii_uppercase())
    }

    /// Concrete bases `code` may stand for, empty for an unknown code.
    pub fn nucleotides_for(&self, code: char) -> &'static [char] {
        self.table
            .get(&code.to_ascii_uppercase())
            .copied()
            .unwrap_or(&[])
    }

    /// True iff `base` is a concrete nucleotide contained in the set of `code`.
    pub fn base_matches(&self, base: char, code: char) -> bool {
        let base = base.to_ascii_uppercase();
        NUCLEOTIDES.contains(&base) && self.nucleotides_for(code).contains(&base)
    }

    /// True iff the window of `sequence` starting at `offset` matches every
    /// position of `motif`. Windows running past the end never match.
    pub fn window_matches(&self, sequence: &str, motif: &str, offset: usize) -> bool {
        let seq = sequence.as_bytes();
        let pattern = motif.as_bytes();
        match offset.checked_add(pattern.len()) {
            Some(end) if end <= seq.len() => seq[offset..end]
                .iter()
                .zip(pattern)
                .all(|(&base, &code)| self.base_matches(base as char, code as char)),
            _ => false,
        }
    }

    /// Every matching window offset, ascending.
    pub fn find_all_windows(&self, sequence: &str, motif: &str) -> Vec<usize> {
        if sequence.len() < motif.len() {
            return Vec::new();
        }
        (0..=sequence.len() - motif.len())
            .filter(|&offset| self.window_matches(sequence, motif, offset))
            .collect()
    }
}
