//! Per-sequence and per-collection motif scanning.

use crate::iupac::IupacCodes;
use crate::types::{Motif, MotifMatch, MotifResult, Sequence};
use rayon::prelude::*;

/// Scans sequence collections for motifs using a borrowed IUPAC table.
#[derive(Debug, Clone, Copy)]
pub struct MotifScanner<'a> {
    codes: &'a IupacCodes,
}

impl<'a> MotifScanner<'a> {
    pub fn new(codes: &'a IupacCodes) -> Self {
        MotifScanner { codes }
    }

    /// Lowest matching window offset, stopping at the first hit.
    pub fn first_match(&self, sequence: &str, motif: &str) -> Option<usize> {
        if sequence.len() < motif.len() {
            return None;
        }
        (0..=sequence.len() - motif.len()).find(|&offset| self.codes.window_matches(sequence, motif, offset))
    }

    /// Counts the sequences containing `motif` at least once.
    ///
    /// The frequency is relative to `sequences.len()`, which is only the
    /// global frequency when `sequences` is the complete collection.
    pub fn scan_motif_against_sequences(&self, sequences: &[Sequence], motif: &Motif) -> MotifResult {
        self.scan_motif_from(sequences, motif, 0)
    }

    /// Like [`scan_motif_against_sequences`](Self::scan_motif_against_sequences),
    /// with evidence indices shifted by `base_index` so that a partition
    /// reports positions in the original collection.
    pub fn scan_motif_from(&self, sequences: &[Sequence], motif: &Motif, base_index: usize) -> MotifResult {
        let pattern = motif.pattern.as_str();
        let mut result = MotifResult::new(pattern);

        for (idx, seq) in sequences.iter().enumerate() {
            if let Some(position) = self.first_match(&seq.sequence, pattern) {
                result.match_count += 1;
                result.matches.push(MotifMatch {
                    sequence_index: base_index + idx,
                    position,
                    matched: seq.sequence[position..position + pattern.len()].to_string(),
                });
            }
        }

        result.calculate_frequency(sequences.len());
        result
    }

    /// Scans every motif independently, in parallel on the current rayon pool.
    /// The output order always equals the input motif order.
    pub fn scan_all_motifs(&self, sequences: &[Sequence], motifs: &[Motif]) -> Vec<MotifResult> {
        self.scan_all_motifs_from(sequences, motifs, 0)
    }

    /// Like [`scan_all_motifs`](Self::scan_all_motifs) for a block of a larger
    /// collection: evidence indices are offset by `base_index`, and frequencies
    /// are relative to the block.
    pub fn scan_all_motifs_from(
        &self,
        sequences: &[Sequence],
        motifs: &[Motif],
        base_index: usize,
    ) -> Vec<MotifResult> {
        // Each rayon job accumulates into its own list; lists are joined in
        // reduce and re-keyed by motif index afterwards.
        let mut keyed: Vec<(usize, MotifResult)> = motifs
            .par_iter()
            .enumerate()
            .fold(Vec::new, |mut acc, (idx, motif)| {
                acc.push((idx, self.scan_motif_from(sequences, motif, base_index)));
                acc
            })
            .reduce(Vec::new, |mut left, mut right| {
                left.append(&mut right);
                left
            });

        keyed.sort_unstable_by_key(|(idx, _)| *idx);
        keyed.into_iter().map(|(_, result)| result).collect()
    }
}
