use dna_motif_rs::fasta;
use dna_motif_rs::orchestrator::Orchestrator;
use dna_motif_rs::partition::partition_range;
use dna_motif_rs::types::{Motif, MotifResult, Sequence};

fn count(sequences: &[Sequence], motifs: &[Motif], workers: usize, threads: usize) -> Vec<MotifResult> {
    let mut orchestrator = Orchestrator::new();
    orchestrator.initialize(workers, threads).unwrap();
    let results = orchestrator.run(sequences, motifs).unwrap();
    orchestrator.finalize();
    results
}

fn summary(results: &[MotifResult]) -> Vec<(String, usize, f64)> {
    results
        .iter()
        .map(|r| (r.pattern.clone(), r.match_count, r.frequency))
        .collect()
}

/// Deterministic pseudo-random sequences so the invariance test sees a mix
/// of hits and misses.
fn generated_sequences(n: usize) -> Vec<Sequence> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..n)
        .map(|i| {
            let seq: String = (0..40)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    ['A', 'T', 'G', 'C'][(state % 4) as usize]
                })
                .collect();
            Sequence::new(format!("seq{i}"), seq)
        })
        .collect()
}

fn generated_motifs() -> Vec<Motif> {
    ["ATNNNNGC", "RRRRYYYY", "NNNNNNNN", "WSWSWSWS", "ATGCATGC", "BDHVBDHV", "AAAAAAAA", "KMKMKMKM"]
        .iter()
        .map(|p| Motif::new(*p, 1.0, 2.0, 3.0))
        .collect()
}

#[test]
fn test_chip_fixture_end_to_end() {
    let (sequences, _) = fasta::read_chip_sequences("tests/data/test_chip.fst", Some(40)).unwrap();
    let (motifs, _) = fasta::read_motifs("tests/data/test_motifs.mot", Some(8)).unwrap();

    for workers in [1, 2, 3] {
        let results = count(&sequences, &motifs, workers, 2);
        assert_eq!(
            summary(&results),
            vec![
                ("ATGCATGC".to_string(), 2, 0.4),
                ("TTTTTTTT".to_string(), 1, 0.2),
                ("GGGGGGGG".to_string(), 1, 0.2),
                ("ATRCATGC".to_string(), 2, 0.4),
            ],
            "workers = {workers}"
        );
        let hits: Vec<usize> = results[3].matches.iter().map(|m| m.sequence_index).collect();
        assert_eq!(hits, vec![0, 4]);
        assert_eq!(results[3].matches[0].matched, "ATGCATGC");
    }
}

#[test]
fn test_results_do_not_depend_on_worker_count() {
    let sequences = generated_sequences(101);
    let motifs = generated_motifs();

    let reference = count(&sequences, &motifs, 1, 1);
    assert_eq!(reference.len(), motifs.len());
    assert_eq!(reference[2].match_count, 101);
    assert_eq!(reference[2].frequency, 1.0);

    for workers in [2, 3, 7] {
        let results = count(&sequences, &motifs, workers, 3);
        assert_eq!(summary(&results), summary(&reference), "workers = {workers}");
        for (got, want) in results.iter().zip(&reference) {
            assert_eq!(got.matches, want.matches);
        }
    }
}

#[test]
fn test_more_workers_than_sequences() {
    let sequences = generated_sequences(3);
    let motifs = generated_motifs();
    let reference = count(&sequences, &motifs, 1, 1);
    let results = count(&sequences, &motifs, 5, 1);
    assert_eq!(summary(&results), summary(&reference));
}

#[test]
fn test_empty_sequence_collection() {
    let motifs = generated_motifs();
    for workers in [1, 4] {
        let results = count(&[], &motifs, workers, 1);
        assert_eq!(results.len(), motifs.len());
        for result in &results {
            assert_eq!(result.match_count, 0);
            assert_eq!(result.frequency, 0.0);
            assert!(result.matches.is_empty());
        }
    }
}

#[test]
fn test_empty_motif_collection() {
    let sequences = generated_sequences(10);
    assert!(count(&sequences, &[], 3, 1).is_empty());
}

#[test]
fn test_short_sequences_contribute_nothing() {
    let sequences = vec![
        Sequence::new("short", "ATGCATG"),
        Sequence::new("full", "ATGC".repeat(10)),
    ];
    let motifs = vec![Motif::new("NNNNNNNN", 0.0, 0.0, 0.0)];
    let results = count(&sequences, &motifs, 2, 1);
    assert_eq!(results[0].match_count, 1);
    assert_eq!(results[0].frequency, 0.5);
    assert_eq!(results[0].matches[0].sequence_index, 1);
}

#[test]
fn test_repeated_motif_is_reported_once() {
    let sequences = generated_sequences(20);
    let mut motifs = generated_motifs();
    motifs.push(motifs[0].clone());

    let results = count(&sequences, &motifs, 3, 2);
    assert_eq!(results.len(), motifs.len() - 1);
    let reference = count(&sequences, &motifs[..motifs.len() - 1], 1, 1);
    assert_eq!(summary(&results), summary(&reference));
}

#[test]
fn test_partition_ranges_are_contiguous() {
    for total in 0..=11 {
        for workers in [1, 2, 3, 5] {
            let mut covered = Vec::new();
            for rank in 0..workers {
                let (start, count) = partition_range(total, rank, workers).unwrap();
                covered.extend(start..start + count);
            }
            assert_eq!(covered, (0..total).collect::<Vec<_>>());
        }
    }
}
