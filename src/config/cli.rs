//! CLI argument parsing using clap
//!
//! Flag names follow the classic benchmark tool (`--loops`, `--iter`, `--kbs`,
//! `--dbs`, `--tw`, `--ndc`, ...). Every workload flag is optional so that a
//! config file value survives unless the flag is given explicitly.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// dbpulse - data store load generator with streaming latency statistics
#[derive(Parser, Debug, Default)]
#[command(name = "dbpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === Workload Options ===
    /// Number of test loops / corpus partitions (max 131072)
    #[arg(long)]
    pub loops: Option<usize>,

    /// Reads/writes per loop (max 131072)
    #[arg(long = "iter", alias = "iterations")]
    pub iterations: Option<usize>,

    /// r = read (TPS), w = write, rw = read/write
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Key size in bytes
    #[arg(long = "kbs", alias = "key-size")]
    pub key_size: Option<String>,

    /// Data block size in bytes (e.g., 1024, 4k)
    #[arg(long = "dbs", alias = "data-size")]
    pub data_size: Option<String>,

    /// Run test cycles in parallel
    #[arg(short = 'p', long)]
    pub parallel: bool,

    /// Skip data checking on reads
    #[arg(long = "ndc")]
    pub no_data_check: bool,

    /// Seed for corpus generation and worker randomness
    #[arg(long)]
    pub seed: Option<u64>,

    // === TPS Options ===
    /// Timed random read/write throughput run (needs --dur)
    #[arg(long)]
    pub tps: bool,

    /// TPS run length in minutes
    #[arg(long = "dur", alias = "duration")]
    pub duration_minutes: Option<u64>,

    /// Delay before each TPS operation (e.g., 1ns, 50ms, 1s500ms)
    #[arg(long)]
    pub delay: Option<String>,

    /// TPS workers: must be 1 or equal to --loops
    #[arg(long = "tw", alias = "workers")]
    pub workers: Option<usize>,

    // === Store Options ===
    /// Data store driver
    #[arg(long = "db", alias = "store", value_enum)]
    pub store: Option<StoreArg>,

    /// Use stored pattern files instead of generating a corpus
    #[arg(long)]
    pub stored: bool,

    /// Pattern file (repeat for each partition)
    #[arg(long = "pattern")]
    pub patterns: Vec<PathBuf>,

    /// Reuse an existing session name (schema is not created)
    #[arg(long)]
    pub session: Option<String>,

    /// Latency added to every in-memory store operation, in microseconds
    #[arg(long)]
    pub simulated_latency_us: Option<u64>,

    /// Fraction of in-memory store operations that fail (0.0-1.0)
    #[arg(long)]
    pub failure_rate: Option<f64>,

    // === Output Options ===
    /// Upper edge of the latency bucket table, in microseconds
    #[arg(long)]
    pub histogram_max_us: Option<u64>,

    /// Number of latency buckets
    #[arg(long)]
    pub histogram_buckets: Option<usize>,

    /// Print the bucket tables
    #[arg(long)]
    pub show_histogram: bool,

    /// Print p50/p90/p99/p99.9 latencies
    #[arg(long)]
    pub show_percentiles: bool,

    /// Write a JSON report to this path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Export the generated corpus as pattern files into this directory
    #[arg(long)]
    pub export_patterns: Option<PathBuf>,

    // === Configuration File ===
    /// TOML (or .json) configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Dry run - validate configuration without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Workload mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Random reads (TPS) or write-then-read cycles
    #[value(name = "r")]
    Read,
    /// Writes only
    #[value(name = "w")]
    Write,
    /// Mixed reads and writes
    #[value(name = "rw")]
    ReadWrite,
}

/// Data store driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    /// In-process store with optional latency and fault injection
    Memory,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Checks that need no config file
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == Some(0) {
            anyhow::bail!("--tw must be at least 1");
        }
        if let Some(rate) = self.failure_rate {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("--failure-rate must be between 0.0 and 1.0");
            }
        }
        if self.stored && self.export_patterns.is_some() {
            anyhow::bail!("--export-patterns cannot be combined with --stored");
        }
        Ok(())
    }
}
