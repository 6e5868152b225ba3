use crate::error::{MotifError, Result};
use crate::iupac::IupacCodes;
use crate::types::{Motif, MotifResult, Sequence};
use log::warn;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Counters for records accepted and rejected while parsing an input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub parsed: usize,
    pub skipped: usize,
}

/// True if `sequence` is non-empty and made only of A, T, G and C (any case).
pub fn is_valid_dna(sequence: &str) -> bool {
    !sequence.is_empty()
        && sequence
            .chars()
            .all(|c| matches!(c.to_ascii_uppercase(), 'A' | 'T' | 'G' | 'C'))
}

/// Reads ChIP-seq sequences from a FASTA-like file.
///
/// # Arguments
/// * `filename` - Path to the sequence file
/// * `expected_len` - When set, sequences of any other length are skipped
///
/// # Returns
/// * `Result<(Vec<Sequence>, ParseStats)>` - The valid sequences, in file order, and
///   the number of records accepted and skipped
///
/// # Format
/// A header line `>id<TAB>meta1<TAB>meta2...` starts a record. The following
/// non-empty lines are concatenated into its sequence and uppercased.
///
/// # Errors
/// * Returns `MotifError::Io` if the file cannot be opened or read
pub fn read_chip_sequences(filename: &str, expected_len: Option<usize>) -> Result<(Vec<Sequence>, ParseStats)> {
    let file = File::open(filename)?;
    parse_chip_sequences(BufReader::new(file), expected_len)
}

/// Parses ChIP-seq records from any buffered reader. See [`read_chip_sequences`].
pub fn parse_chip_sequences<R: BufRead>(reader: R, expected_len: Option<usize>) -> Result<(Vec<Sequence>, ParseStats)> {
    let mut sequences = Vec::new();
    let mut stats = ParseStats::default();

    let mut current_header: Option<String> = None;
    let mut current_sequence = String::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if line.starts_with('>') {
            if let Some(header) = current_header.take() {
                push_record(&header, &current_sequence, expected_len, &mut sequences, &mut stats);
            }
            // bases seen before the first header belong to no record
            current_sequence.clear();
            current_header = Some(line.to_string());
        } else {
            current_sequence.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if let Some(header) = current_header {
        push_record(&header, &current_sequence, expected_len, &mut sequences, &mut stats);
    }

    Ok((sequences, stats))
}

fn push_record(
    header: &str,
    sequence: &str,
    expected_len: Option<usize>,
    sequences: &mut Vec<Sequence>,
    stats: &mut ParseStats,
) {
    match build_sequence(header, sequence, expected_len) {
        Ok(record) => {
            sequences.push(record);
            stats.parsed += 1;
        }
        Err(e) => {
            warn!("Skipping sequence record '{}': {}", header, e);
            stats.skipped += 1;
        }
    }
}

fn build_sequence(header: &str, sequence: &str, expected_len: Option<usize>) -> Result<Sequence> {
    let mut fields = header[1..].split('\t').map(str::trim);
    let id = fields.next().unwrap_or_default();
    if id.is_empty() {
        return Err(MotifError::InvalidFileFormat("Missing sequence ID".into()));
    }

    if sequence.is_empty() {
        return Err(MotifError::invalid_sequence(0, "empty sequence"));
    }
    if !is_valid_dna(sequence) {
        let position = sequence
            .chars()
            .position(|c| !matches!(c.to_ascii_uppercase(), 'A' | 'T' | 'G' | 'C'))
            .unwrap_or(0);
        return Err(MotifError::invalid_sequence(position, "not a concrete nucleotide"));
    }
    if let Some(len) = expected_len {
        if sequence.len() != len {
            return Err(MotifError::invalid_sequence(
                sequence.len().min(len),
                format!("expected {} bases, found {}", len, sequence.len()),
            ));
        }
    }

    let metadata = fields.map(str::to_string).collect();
    Ok(Sequence::new(id, sequence.to_uppercase()).with_metadata(metadata))
}

/// Reads motifs from a tab-separated file.
///
/// # Arguments
/// * `filename` - Path to the motif file
/// * `expected_len` - When set, patterns of any other length are skipped
///
/// # Format
/// One motif per line: `PATTERN<TAB>score1<TAB>score2<TAB>score3`. Blank lines
/// and lines starting with `#` are ignored. Patterns must use IUPAC codes.
///
/// # Errors
/// * Returns `MotifError::Io` if the file cannot be opened or read
pub fn read_motifs(filename: &str, expected_len: Option<usize>) -> Result<(Vec<Motif>, ParseStats)> {
    let file = File::open(filename)?;
    parse_motifs(BufReader::new(file), expected_len)
}

/// Parses motif lines from any buffered reader. See [`read_motifs`].
pub fn parse_motifs<R: BufRead>(reader: R, expected_len: Option<usize>) -> Result<(Vec<Motif>, ParseStats)> {
    let codes = IupacCodes::standard();
    let mut motifs = Vec::new();
    let mut stats = ParseStats::default();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_motif_line(line, &codes, expected_len) {
            Ok(motif) => {
                motifs.push(motif);
                stats.parsed += 1;
            }
            Err(e) => {
                warn!("Skipping motif line '{}': {}", line, e);
                stats.skipped += 1;
            }
        }
    }

    Ok((motifs, stats))
}

fn parse_motif_line(line: &str, codes: &IupacCodes, expected_len: Option<usize>) -> Result<Motif> {
    let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
    if parts.len() < 4 {
        return Err(MotifError::InvalidFileFormat(format!(
            "expected 4 tab-separated fields, found {}",
            parts.len()
        )));
    }

    let pattern = parts[0].to_uppercase();
    if pattern.is_empty() {
        return Err(MotifError::InvalidInput("empty motif pattern".into()));
    }
    if let Some(position) = pattern.chars().position(|c| !codes.is_valid_code(c)) {
        return Err(MotifError::invalid_sequence(position, "not an IUPAC code"));
    }
    if let Some(len) = expected_len {
        if pattern.len() != len {
            return Err(MotifError::invalid_parameter(
                "pattern length",
                pattern.len(),
                format!("expected {}", len),
            ));
        }
    }

    let scores = parts[1..4]
        .iter()
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MotifError::InvalidFileFormat(format!("Invalid motif score: {}", e)))?;

    Ok(Motif::new(pattern, scores[0], scores[1], scores[2]))
}

/// Converts motif results into a Polars DataFrame.
///
/// # Returns
/// * `Result<DataFrame>` - A DataFrame with three columns:
///   - "motif": The motif pattern
///   - "match_count": Number of sequences containing the motif
///   - "frequency": Fraction of all sequences containing the motif
///
/// # Errors
/// * Returns `MotifError::DataError` if DataFrame creation fails
pub fn results_to_dataframe(results: &[MotifResult]) -> Result<DataFrame> {
    let motifs: Vec<&str> = results.iter().map(|r| r.pattern.as_str()).collect();
    let counts: Vec<u64> = results.iter().map(|r| r.match_count as u64).collect();
    let frequencies: Vec<f64> = results.iter().map(|r| r.frequency).collect();

    let df = DataFrame::new(vec![
        Column::new("motif".into(), motifs),
        Column::new("match_count".into(), counts),
        Column::new("frequency".into(), frequencies),
    ])
    .map_err(|e| MotifError::DataError(e.to_string()))?;

    Ok(df)
}

/// Writes a results DataFrame as a tab-separated file with a header row and
/// six-digit frequencies.
///
/// # Errors
/// * Returns `MotifError::Io` if the file cannot be created
/// * Returns `MotifError::DataError` if serialization fails
pub fn write_results(df: &mut DataFrame, filename: &str) -> Result<()> {
    let mut file = File::create(filename).map_err(MotifError::Io)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b'\t')
        .with_float_precision(Some(6))
        .finish(df)
        .map_err(|e| MotifError::DataError(e.to_string()))?;

    Ok(())
}

/// Renders results as the fixed-width console table.
pub fn format_results_table(results: &[MotifResult]) -> String {
    let mut out = format!("{:>20}{:>15}{:>15}\n", "Motif Pattern", "Match Count", "Frequency");
    out.push_str(&"-".repeat(50));
    out.push('\n');
    for result in results {
        out.push_str(&format!(
            "{:>20}{:>15}{:>15.4}\n",
            result.pattern, result.match_count, result.frequency
        ));
    }
    out
}
