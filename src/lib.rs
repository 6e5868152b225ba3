//! Partition-invariant IUPAC motif counting over ChIP-seq sequence collections

pub mod config;
pub mod error;
pub mod fasta;
pub mod iupac;
pub mod orchestrator;
pub mod partition;
pub mod scanner;
pub mod types;
