//! Work partitioning across worker ranks and the coordinator-side merge.
//!
//! Sequences are split into contiguous, near-equal blocks; motifs are
//! broadcast whole to every rank. Each rank scores only its own block, so the
//! per-rank results are partial and [`merge`] re-keys them by motif pattern to
//! recover one global result per motif. Because the merge sums counts and
//! recomputes frequencies against the full collection size, the output does
//! not depend on how many ranks took part.
//!
//! Data moves between ranks only through the [`Collective`] operations. All
//! of them block the calling thread until its share of the exchange is done,
//! and none can be cancelled: a rank that never reaches a collective stalls
//! the whole run. That hang is fatal and must be caught from outside.

use crate::error::{MotifError, Result};
use crate::types::{Motif, MotifResult, Sequence};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

/// Rank that distributes inputs and merges the gathered results.
pub const COORDINATOR_RANK: usize = 0;

/// Start index and length of the block owned by `worker_rank`.
///
/// The first `total_items % worker_count` ranks receive one extra item. Ranks
/// beyond the available items get an empty block starting at a well-defined
/// offset, and ranks outside the topology get `(total_items, 0)`.
///
/// # Errors
/// * Returns `MotifError::InvalidParameter` if `worker_count` is zero
pub fn partition_range(total_items: usize, worker_rank: usize, worker_count: usize) -> Result<(usize, usize)> {
    if worker_count == 0 {
        return Err(MotifError::invalid_parameter(
            "worker_count",
            worker_count,
            "at least one worker is required",
        ));
    }
    if worker_rank >= worker_count {
        return Ok((total_items, 0));
    }

    let base = total_items / worker_count;
    let extra = total_items % worker_count;

    let start = worker_rank * base + worker_rank.min(extra);
    let count = base + usize::from(worker_rank < extra);
    Ok((start, count))
}

/// A contiguous block of the sequence collection handed to one rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub rank: usize,
    /// Index of the first sequence of the block in the full collection.
    pub start: usize,
    /// Size of the full collection.
    pub total: usize,
    pub sequences: Vec<Sequence>,
}

/// Splits `sequences` into one [`Partition`] per rank, in rank order.
///
/// # Errors
/// * Returns `MotifError::InvalidParameter` if `worker_count` is zero
pub fn distribute(sequences: &[Sequence], worker_count: usize) -> Result<Vec<Partition>> {
    if worker_count == 0 {
        return Err(MotifError::invalid_parameter(
            "worker_count",
            worker_count,
            "at least one worker is required",
        ));
    }
    (0..worker_count)
        .map(|rank| {
            let (start, count) = partition_range(sequences.len(), rank, worker_count)?;
            Ok(Partition {
                rank,
                start,
                total: sequences.len(),
                sequences: sequences[start..start + count].to_vec(),
            })
        })
        .collect()
}

/// One identical, order-preserving copy of `motifs` per rank.
pub fn replicate(motifs: &[Motif], worker_count: usize) -> Vec<Vec<Motif>> {
    vec![motifs.to_vec(); worker_count]
}

/// Combines per-rank partial results into one result per distinct pattern.
///
/// Patterns keep the order of their first appearance, which is the input
/// motif order since every rank scanned the same list. Counts are summed,
/// the frequency is recomputed against `total_sequence_count`, and evidence
/// is deduplicated per sequence and sorted by sequence index. A pattern that
/// occurs more than once in a single rank's list is counted once.
pub fn merge(per_worker: Vec<Vec<MotifResult>>, total_sequence_count: usize) -> Vec<MotifResult> {
    let mut merged: Vec<MotifResult> = Vec::new();
    let mut slot_of: HashMap<String, usize> = HashMap::new();

    for worker_results in per_worker {
        let mut seen: HashSet<String> = HashSet::new();
        for partial in worker_results {
            if !seen.insert(partial.pattern.clone()) {
                continue;
            }
            match slot_of.get(&partial.pattern) {
                Some(&slot) => {
                    let entry = &mut merged[slot];
                    entry.match_count += partial.match_count;
                    entry.matches.extend(partial.matches);
                }
                None => {
                    slot_of.insert(partial.pattern.clone(), merged.len());
                    merged.push(partial);
                }
            }
        }
    }

    for result in &mut merged {
        result.matches.sort();
        result.matches.dedup_by_key(|m| m.sequence_index);
        result.calculate_frequency(total_sequence_count);
    }
    merged
}

/// Collective operations connecting the ranks of one run.
///
/// Implementations exist per deployment; the pipeline in
/// [`run_rank`](crate::orchestrator::run_rank) only talks to this trait.
pub trait Collective: Send {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    /// Scatter: the coordinator passes the full collection and every rank
    /// receives its own block. Non-coordinator arguments are ignored.
    fn scatter_sequences(&self, sequences: &[Sequence]) -> Result<Partition>;

    /// Broadcast: every rank receives the coordinator's motif list.
    fn broadcast_motifs(&self, motifs: &[Motif]) -> Result<Vec<Motif>>;

    /// Blocks until every rank has arrived.
    fn barrier(&self) -> Result<()>;

    /// Gather-to-one: the coordinator receives every rank's results in rank
    /// order, other ranks receive `None`.
    fn gather_results(&self, local: Vec<MotifResult>) -> Result<Option<Vec<Vec<MotifResult>>>>;
}

enum Envelope {
    Partition(Partition),
    Motifs(Vec<Motif>),
    Results { rank: usize, results: Vec<MotifResult> },
}

impl Envelope {
    fn kind(&self) -> &'static str {
        match self {
            Envelope::Partition(_) => "partition",
            Envelope::Motifs(_) => "motifs",
            Envelope::Results { .. } => "results",
        }
    }
}

/// In-process endpoint: ranks are threads of the current process connected
/// by channels and a shared barrier.
pub struct LocalCollective {
    rank: usize,
    size: usize,
    inbox: Receiver<Envelope>,
    /// Coordinator: one sender per worker. Worker: the coordinator's sender.
    peers: Vec<(usize, Sender<Envelope>)>,
    barrier: Arc<Barrier>,
}

impl LocalCollective {
    /// Builds `size` connected endpoints, indexed by rank.
    ///
    /// # Errors
    /// * Returns `MotifError::InvalidParameter` if `size` is zero
    pub fn topology(size: usize) -> Result<Vec<LocalCollective>> {
        if size == 0 {
            return Err(MotifError::invalid_parameter("size", size, "topology needs at least one rank"));
        }
        let barrier = Arc::new(Barrier::new(size));
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel::<Envelope>()).unzip();

        let endpoints = receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| {
                // The coordinator never holds a sender to its own inbox, so a
                // vanished worker shows up as a disconnected channel.
                let peers = if rank == COORDINATOR_RANK {
                    senders
                        .iter()
                        .enumerate()
                        .skip(1)
                        .map(|(peer, tx)| (peer, tx.clone()))
                        .collect()
                } else {
                    vec![(COORDINATOR_RANK, senders[COORDINATOR_RANK].clone())]
                };
                LocalCollective {
                    rank,
                    size,
                    inbox,
                    peers,
                    barrier: Arc::clone(&barrier),
                }
            })
            .collect();
        Ok(endpoints)
    }

    fn send(&self, peer: usize, tx: &Sender<Envelope>, envelope: Envelope) -> Result<()> {
        tx.send(envelope)
            .map_err(|_| MotifError::collective(format!("rank {} is no longer reachable from rank {}", peer, self.rank)))
    }

    fn receive(&self, expected: &'static str) -> Result<Envelope> {
        self.inbox.recv().map_err(|_| {
            MotifError::collective(format!(
                "rank {} lost its peers while waiting for {}",
                self.rank, expected
            ))
        })
    }

    fn out_of_protocol(&self, expected: &'static str, received: &Envelope) -> MotifError {
        MotifError::collective(format!(
            "rank {} expected {} but received {}",
            self.rank,
            expected,
            received.kind()
        ))
    }
}

impl Collective for LocalCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn scatter_sequences(&self, sequences: &[Sequence]) -> Result<Partition> {
        if !self.is_coordinator() {
            return match self.receive("partition")? {
                Envelope::Partition(partition) => Ok(partition),
                other => Err(self.out_of_protocol("partition", &other)),
            };
        }

        let mut own = None;
        for partition in distribute(sequences, self.size)? {
            debug!(
                "rank {} <- sequences [{}, {})",
                partition.rank,
                partition.start,
                partition.start + partition.sequences.len()
            );
            if partition.rank == self.rank {
                own = Some(partition);
                continue;
            }
            let (peer, tx) = &self.peers[partition.rank - 1];
            self.send(*peer, tx, Envelope::Partition(partition))?;
        }
        own.ok_or_else(|| MotifError::collective("coordinator received no partition"))
    }

    fn broadcast_motifs(&self, motifs: &[Motif]) -> Result<Vec<Motif>> {
        if !self.is_coordinator() {
            return match self.receive("motifs")? {
                Envelope::Motifs(motifs) => Ok(motifs),
                other => Err(self.out_of_protocol("motifs", &other)),
            };
        }

        let mut copies = replicate(motifs, self.size).into_iter();
        let own = copies.next().unwrap_or_default();
        for ((peer, tx), copy) in self.peers.iter().zip(copies) {
            self.send(*peer, tx, Envelope::Motifs(copy))?;
        }
        Ok(own)
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }

    fn gather_results(&self, local: Vec<MotifResult>) -> Result<Option<Vec<Vec<MotifResult>>>> {
        if !self.is_coordinator() {
            let (peer, tx) = &self.peers[0];
            self.send(
                *peer,
                tx,
                Envelope::Results {
                    rank: self.rank,
                    results: local,
                },
            )?;
            return Ok(None);
        }

        let mut slots: Vec<Option<Vec<MotifResult>>> = vec![None; self.size];
        slots[self.rank] = Some(local);
        for _ in 1..self.size {
            match self.receive("results")? {
                Envelope::Results { rank, results } => match slots.get_mut(rank) {
                    Some(slot) if slot.is_none() => *slot = Some(results),
                    _ => {
                        return Err(MotifError::collective(format!(
                            "unexpected results from rank {}",
                            rank
                        )))
                    }
                },
                other => return Err(self.out_of_protocol("results", &other)),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(rank, slot)| {
                slot.ok_or_else(|| MotifError::collective(format!("no results from rank {}", rank)))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MotifMatch;

    #[test]
    fn test_partition_range_covers_everything_once() {
        for total in 0..=11 {
            for workers in [1, 2, 3, 5] {
                let mut next = 0;
                for rank in 0..workers {
                    let (start, count) = partition_range(total, rank, workers).unwrap();
                    assert_eq!(start, next, "gap or overlap at total={total} workers={workers} rank={rank}");
                    next = start + count;
                }
                assert_eq!(next, total);
            }
        }
    }

    #[test]
    fn test_partition_range_remainder_goes_to_low_ranks() {
        assert_eq!(partition_range(10, 0, 3).unwrap(), (0, 4));
        assert_eq!(partition_range(10, 1, 3).unwrap(), (4, 3));
        assert_eq!(partition_range(10, 2, 3).unwrap(), (7, 3));
        assert_eq!(partition_range(2, 4, 5).unwrap(), (2, 0));
        assert_eq!(partition_range(0, 3, 5).unwrap(), (0, 0));
        assert_eq!(partition_range(5, 9, 3).unwrap(), (5, 0));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        assert!(matches!(
            partition_range(10, 0, 0),
            Err(MotifError::InvalidParameter { .. })
        ));
        assert!(matches!(distribute(&[], 0), Err(MotifError::InvalidParameter { .. })));
        assert!(matches!(
            LocalCollective::topology(0),
            Err(MotifError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_distribute_reconstructs_collection() {
        let sequences: Vec<Sequence> = (0..7)
            .map(|i| Sequence::new(format!("seq{i}"), "A".repeat(40)))
            .collect();
        let partitions = distribute(&sequences, 3).unwrap();
        assert_eq!(partitions.len(), 3);
        let rebuilt: Vec<Sequence> = partitions.into_iter().flat_map(|p| p.sequences).collect();
        assert_eq!(rebuilt, sequences);
    }

    #[test]
    fn test_replicate() {
        let motifs = vec![Motif::new("ATGCATGC", 1.0, 2.0, 3.0), Motif::new("NNNNNNNN", 0.0, 0.0, 0.0)];
        let copies = replicate(&motifs, 4);
        assert_eq!(copies.len(), 4);
        assert!(copies.iter().all(|copy| copy == &motifs));
    }

    fn partial(pattern: &str, hits: &[usize], scanned: usize) -> MotifResult {
        let mut result = MotifResult::new(pattern);
        result.match_count = hits.len();
        result.matches = hits
            .iter()
            .map(|&idx| MotifMatch {
                sequence_index: idx,
                position: 0,
                matched: pattern.to_string(),
            })
            .collect();
        result.calculate_frequency(scanned);
        result
    }

    #[test]
    fn test_merge_sums_and_recomputes_frequency() {
        let per_worker = vec![
            vec![partial("ATGCATGC", &[0], 3), partial("TTTTTTTT", &[1], 3)],
            vec![partial("ATGCATGC", &[4], 2), partial("TTTTTTTT", &[], 2)],
        ];
        let merged = merge(per_worker, 5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].pattern, "ATGCATGC");
        assert_eq!(merged[0].match_count, 2);
        assert_eq!(merged[0].frequency, 0.4);
        assert_eq!(merged[0].matches.len(), 2);
        assert_eq!(merged[1].pattern, "TTTTTTTT");
        assert_eq!(merged[1].match_count, 1);
        assert_eq!(merged[1].frequency, 0.2);
    }

    #[test]
    fn test_merge_collapses_repeated_pattern_within_worker() {
        let per_worker = vec![vec![partial("GGGGGGGG", &[2], 4), partial("GGGGGGGG", &[2], 4)]];
        let merged = merge(per_worker, 4);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].match_count, 1);
        assert_eq!(merged[0].matches.len(), 1);
    }

    #[test]
    fn test_merge_of_empty_collection() {
        let merged = merge(vec![vec![partial("ATGCATGC", &[], 0)]], 0);
        assert_eq!(merged[0].frequency, 0.0);
    }

    #[test]
    fn test_local_collective_single_rank() {
        let comms = LocalCollective::topology(1).unwrap();
        let comm = &comms[0];
        assert!(comm.is_coordinator());
        let sequences = vec![Sequence::new("seq1", "A".repeat(40))];
        let partition = comm.scatter_sequences(&sequences).unwrap();
        assert_eq!(partition.sequences, sequences);
        assert_eq!(partition.total, 1);
        comm.barrier().unwrap();
        let gathered = comm.gather_results(vec![MotifResult::new("AAAAAAAA")]).unwrap();
        assert_eq!(gathered.unwrap().len(), 1);
    }

    #[test]
    fn test_worker_reports_lost_coordinator() {
        let mut comms = LocalCollective::topology(2).unwrap();
        let worker = comms.pop().unwrap();
        drop(comms);
        assert!(matches!(worker.scatter_sequences(&[]), Err(MotifError::Collective(_))));
    }
}
