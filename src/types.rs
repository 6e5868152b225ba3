/// Length of every ChIP-seq sequence accepted by the parser.
pub const CHIP_SEQ_LENGTH: usize = 40;

/// Length of every motif pattern accepted by the parser.
pub const MOTIF_LENGTH: usize = 8;

/// A ChIP-seq sequence with its identifier and the tab-separated header tokens
/// that followed the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub id: String,
    pub sequence: String,
    pub metadata: Vec<String>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Sequence {
            id: id.into(),
            sequence: sequence.into(),
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An IUPAC motif pattern. The three scores are carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    pub pattern: String,
    pub score1: f64,
    pub score2: f64,
    pub score3: f64,
}

impl Motif {
    pub fn new(pattern: impl Into<String>, score1: f64, score2: f64, score3: f64) -> Self {
        Motif {
            pattern: pattern.into(),
            score1,
            score2,
            score3,
        }
    }
}

/// Evidence of a hit: the first window of a sequence matching a motif.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MotifMatch {
    /// Index of the sequence in the collection that was scanned.
    pub sequence_index: usize,
    /// Window start offset inside the sequence.
    pub position: usize,
    pub matched: String,
}

/// Per-motif match count and frequency over a sequence collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MotifResult {
    pub pattern: String,
    /// Number of distinct sequences with at least one matching window.
    pub match_count: usize,
    /// `match_count / total`, or 0.0 for an empty collection.
    pub frequency: f64,
    /// One entry per matching sequence.
    pub matches: Vec<MotifMatch>,
}

impl MotifResult {
    pub fn new(pattern: impl Into<String>) -> Self {
        MotifResult {
            pattern: pattern.into(),
            match_count: 0,
            frequency: 0.0,
            matches: Vec::new(),
        }
    }

    /// Recomputes `frequency` against `total_sequences`.
    pub fn calculate_frequency(&mut self, total_sequences: usize) {
        self.frequency = if total_sequences > 0 {
            self.match_count as f64 / total_sequences as f64
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_of_empty_collection_is_zero() {
        let mut result = MotifResult::new("ATGCATGC");
        result.calculate_frequency(0);
        assert_eq!(result.frequency, 0.0);
        assert!(!result.frequency.is_nan());
    }

    #[test]
    fn test_frequency() {
        let mut result = MotifResult::new("ATGCATGC");
        result.match_count = 2;
        result.calculate_frequency(5);
        assert_eq!(result.frequency, 0.4);
    }
}
