//! End-to-end pipeline: distribute, scan, barrier, gather, merge.

use crate::error::{MotifError, Result};
use crate::iupac::IupacCodes;
use crate::partition::{merge, Collective, LocalCollective};
use crate::scanner::MotifScanner;
use crate::types::{Motif, MotifResult, Sequence};
use log::{debug, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::time::Instant;

/// Lifecycle of an [`Orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Ready,
    Running,
    Finalized,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::Ready => "ready",
            State::Running => "running",
            State::Finalized => "finalized",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of worker ranks and the thread count each rank scans with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub worker_count: usize,
    /// Threads per rank; 0 lets rayon pick.
    pub local_parallelism: usize,
}

/// Runs one rank of the pipeline against any [`Collective`] implementation.
///
/// The coordinator passes the full inputs and receives the merged results;
/// every other rank passes empty inputs and receives an empty list.
pub fn run_rank<C: Collective + ?Sized>(
    comm: &C,
    pool: &ThreadPool,
    scanner: &MotifScanner<'_>,
    sequences: &[Sequence],
    motifs: &[Motif],
) -> Result<Vec<MotifResult>> {
    let partition = comm.scatter_sequences(sequences)?;
    let local_motifs = comm.broadcast_motifs(motifs)?;

    let started = Instant::now();
    let local = pool.install(|| scanner.scan_all_motifs_from(&partition.sequences, &local_motifs, partition.start));
    debug!(
        "rank {}: scanned {} sequences x {} motifs in {:.4}s",
        comm.rank(),
        partition.sequences.len(),
        local_motifs.len(),
        started.elapsed().as_secs_f64()
    );

    comm.barrier()?;

    match comm.gather_results(local)? {
        Some(per_worker) => Ok(merge(per_worker, partition.total)),
        None => Ok(Vec::new()),
    }
}

/// Owns the worker topology and drives the in-process deployment.
///
/// ```
/// use dna_motif_rs::orchestrator::Orchestrator;
/// use dna_motif_rs::types::{Motif, Sequence};
///
/// let mut orchestrator = Orchestrator::new();
/// orchestrator.initialize(2, 2).unwrap();
/// let sequences = vec![Sequence::new("seq1", "ATGC".repeat(10))];
/// let motifs = vec![Motif::new("ATRCATGC", 0.0, 0.0, 0.0)];
/// let results = orchestrator.run(&sequences, &motifs).unwrap();
/// assert_eq!(results[0].match_count, 1);
/// orchestrator.finalize();
/// ```
pub struct Orchestrator {
    state: State,
    topology: Option<Topology>,
    pools: Vec<ThreadPool>,
    codes: IupacCodes,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Orchestrator {
            state: State::Uninitialized,
            topology: None,
            pools: Vec::new(),
            codes: IupacCodes::standard(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn topology(&self) -> Option<Topology> {
        self.topology
    }

    /// Sets up `worker_count` ranks, each with a pool of `local_parallelism`
    /// threads. Only valid once, on a fresh orchestrator.
    pub fn initialize(&mut self, worker_count: usize, local_parallelism: usize) -> Result<()> {
        if self.state != State::Uninitialized {
            return Err(MotifError::State {
                operation: "initialize",
                state: self.state.name(),
            });
        }
        if worker_count == 0 {
            return Err(MotifError::invalid_parameter(
                "worker_count",
                worker_count,
                "at least one worker is required",
            ));
        }

        let pools = (0..worker_count)
            .map(|rank| {
                ThreadPoolBuilder::new()
                    .num_threads(local_parallelism)
                    .thread_name(move |idx| format!("motif-rank{}-{}", rank, idx))
                    .build()
                    .map_err(|e| MotifError::ThreadPool(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Initialized {} worker ranks with {} threads each",
            worker_count,
            pools.first().map_or(0, ThreadPool::current_num_threads)
        );

        self.pools = pools;
        self.topology = Some(Topology {
            worker_count,
            local_parallelism,
        });
        self.state = State::Ready;
        Ok(())
    }

    /// Counts, for every distinct motif, the sequences containing it.
    ///
    /// Results follow the input motif order and are identical for any worker
    /// count. Each call is independent of the previous ones.
    pub fn run(&mut self, sequences: &[Sequence], motifs: &[Motif]) -> Result<Vec<MotifResult>> {
        if self.state != State::Ready {
            return Err(MotifError::State {
                operation: "run",
                state: self.state.name(),
            });
        }

        self.state = State::Running;
        let outcome = self.run_local(sequences, motifs);
        self.state = State::Ready;
        outcome
    }

    fn run_local(&self, sequences: &[Sequence], motifs: &[Motif]) -> Result<Vec<MotifResult>> {
        let started = Instant::now();
        info!(
            "Processing {} sequences and {} motifs on {} ranks",
            sequences.len(),
            motifs.len(),
            self.pools.len()
        );

        let scanner = MotifScanner::new(&self.codes);
        let mut endpoints = LocalCollective::topology(self.pools.len())?.into_iter();
        let coordinator = endpoints
            .next()
            .ok_or_else(|| MotifError::collective("topology has no coordinator"))?;

        let results = std::thread::scope(|scope| {
            let workers: Vec<_> = endpoints
                .zip(self.pools.iter().skip(1))
                .map(|(comm, pool)| scope.spawn(move || run_rank(&comm, pool, &scanner, &[], &[])))
                .collect();

            let merged = run_rank(&coordinator, &self.pools[0], &scanner, sequences, motifs);
            drop(coordinator);

            for (offset, worker) in workers.into_iter().enumerate() {
                match worker.join() {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        return Err(MotifError::collective(format!("worker rank {} panicked", offset + 1)))
                    }
                }
            }
            merged
        })?;

        info!("Processing completed in {:.2} seconds", started.elapsed().as_secs_f64());
        Ok(results)
    }

    /// Releases the worker topology. Further calls are no-ops.
    pub fn finalize(&mut self) {
        if self.state == State::Finalized {
            return;
        }
        self.pools.clear();
        self.topology = None;
        self.state = State::Finalized;
        debug!("Orchestrator finalized");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.finalize();
    }
}
