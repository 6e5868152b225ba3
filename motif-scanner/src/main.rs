use clap::Parser;
use dna_motif_rs::config::ScanConfig;
use dna_motif_rs::error::MotifError;
use dna_motif_rs::fasta::{format_results_table, read_chip_sequences, read_motifs, results_to_dataframe, write_results};
use dna_motif_rs::orchestrator::Orchestrator;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Motif(#[from] MotifError),

    #[error("Input file '{0}' does not exist")]
    MissingInput(String),
}

#[derive(Parser)]
#[command(
    name = "motif-scanner",
    about = "Counts how many ChIP-seq sequences contain each IUPAC motif",
    long_about = "A tool for counting, for every motif in a motif file, the number and fraction of \
                  ChIP-seq sequences containing at least one match. Motifs may use IUPAC ambiguity \
                  codes. Sequences are split across worker ranks and each rank scans its motifs \
                  on its own thread pool.",
    version,
    after_help = "Example usage:\n    \
                  motif-scanner -w 4 -t 8 sequences.fst motifs.mot results.tsv\n    \
                  motif-scanner sequences.fst motifs.mot",
    color = clap::ColorChoice::Always
)]
#[derive(Debug)]
struct Args {
    /// Path to the ChIP-seq sequence file
    /// Header lines are `>id<TAB>metadata...`, followed by the sequence
    #[arg(value_name = "CHIP_SEQ_FILE")]
    chip_seq_file: String,

    /// Path to the motif file
    /// One `PATTERN<TAB>score1<TAB>score2<TAB>score3` per line
    #[arg(value_name = "MOTIFS_FILE")]
    motifs_file: String,

    /// Optional tab-separated output file (default: print a table)
    /// Will create output directory if it doesn't exist
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: Option<String>,

    /// Scan threads per worker rank
    #[arg(short, long)]
    threads: Option<usize>,

    /// Number of worker ranks
    #[arg(short, long)]
    workers: Option<usize>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(args: &Args) -> Result<ScanConfig, ScannerError> {
    let mut config = ScanConfig::load(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), ScannerError> {
    let start_time = std::time::Instant::now();

    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    for input in [&args.chip_seq_file, &args.motifs_file] {
        if !Path::new(input).exists() {
            return Err(ScannerError::MissingInput(input.clone()));
        }
    }

    let config = load_config(&args)?;

    let (sequences, seq_stats) = read_chip_sequences(&args.chip_seq_file, Some(config.sequence_length))?;
    let (motifs, motif_stats) = read_motifs(&args.motifs_file, Some(config.motif_length))?;
    info!(
        "Loaded {} sequences ({} skipped) and {} motifs ({} skipped)",
        seq_stats.parsed, seq_stats.skipped, motif_stats.parsed, motif_stats.skipped
    );

    let mut orchestrator = Orchestrator::new();
    orchestrator.initialize(config.workers, config.threads)?;
    let results = orchestrator.run(&sequences, &motifs)?;
    orchestrator.finalize();

    match &args.output_file {
        Some(output_file) => {
            // Create output directory if it doesn't exist
            if let Some(parent) = Path::new(output_file).parent() {
                fs::create_dir_all(parent)?;
            }
            let mut df = results_to_dataframe(&results)?;
            write_results(&mut df, output_file)?;
            info!("Results saved to: {}", output_file);
        }
        None => print!("{}", format_results_table(&results)),
    }

    let elapsed = start_time.elapsed();
    info!("Total execution time: {:.4} seconds", elapsed.as_secs_f64());

    Ok(())
}
