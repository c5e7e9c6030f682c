//! Configuration module
//!
//! Handles CLI argument parsing, TOML/JSON configuration files, and validation.
//! A config file supplies the baseline; CLI flags override individual fields.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;
pub mod workload;

use crate::corpus::CorpusShape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use workload::*;

/// Upper bound for both `loops` and `iterations`
pub const MAX_LOOPS: usize = 131_072;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Store driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Pattern files (one per partition) for stored-pattern runs
    #[serde(default)]
    pub patterns: Vec<PathBuf>,
    /// Latency added to each in-memory operation
    #[serde(default)]
    pub simulated_latency_us: u64,
    /// Fraction of in-memory operations that fail (0.0 - 1.0)
    #[serde(default)]
    pub failure_rate: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            patterns: Vec::new(),
            simulated_latency_us: 0,
            failure_rate: 0.0,
        }
    }
}

/// What the run does and how long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Number of corpus partitions (1 - 131072)
    #[serde(default = "default_loops")]
    pub loops: usize,
    /// Records per partition (1 - 131072)
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub mode: WorkloadMode,
    #[serde(default = "default_key_size")]
    pub key_size: usize,
    #[serde(default = "default_data_size")]
    pub data_size: usize,
    /// Run test cycles concurrently
    #[serde(default)]
    pub parallel: bool,
    /// Timed throughput run instead of test cycles
    #[serde(default)]
    pub tps: bool,
    #[serde(default)]
    pub duration_minutes: u64,
    /// Pause before each TPS operation, e.g. "1s500ms"
    #[serde(default = "default_delay")]
    pub delay: String,
    /// TPS workers: 1 or equal to `loops`
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Compare read values against the corpus
    #[serde(default = "default_verify")]
    pub verify: bool,
    /// Load the corpus from `store.patterns` instead of generating it
    #[serde(default)]
    pub stored_patterns: bool,
    /// Reuse an existing session (skips schema creation and prepopulation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Seed for corpus generation and worker RNGs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_loops() -> usize {
    1
}

fn default_iterations() -> usize {
    1000
}

fn default_key_size() -> usize {
    20
}

fn default_data_size() -> usize {
    1024
}

fn default_delay() -> String {
    "0".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_verify() -> bool {
    true
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            loops: default_loops(),
            iterations: default_iterations(),
            mode: WorkloadMode::default(),
            key_size: default_key_size(),
            data_size: default_data_size(),
            parallel: false,
            tps: false,
            duration_minutes: 0,
            delay: default_delay(),
            workers: default_workers(),
            verify: default_verify(),
            stored_patterns: false,
            session: None,
            seed: None,
        }
    }
}

impl WorkloadConfig {
    /// Parsed `delay`
    pub fn delay(&self) -> anyhow::Result<Duration> {
        cli_convert::parse_delay(&self.delay)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_minutes.saturating_mul(60))
    }

    pub fn corpus_shape(&self) -> CorpusShape {
        CorpusShape {
            partitions: self.loops,
            records_per_partition: self.iterations,
            key_size: self.key_size,
            data_size: self.data_size,
            seed: self.seed,
        }
    }
}

/// Report settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Upper edge of the bucket table; slower samples are outliers
    #[serde(default = "default_histogram_max_us")]
    pub histogram_max_us: u64,
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: usize,
    #[serde(default)]
    pub show_histogram: bool,
    #[serde(default)]
    pub show_percentiles: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_output: Option<PathBuf>,
    /// Write the generated corpus as pattern files into this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_patterns: Option<PathBuf>,
}

fn default_histogram_max_us() -> u64 {
    10_000
}

fn default_histogram_buckets() -> usize {
    20
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            histogram_max_us: default_histogram_max_us(),
            histogram_buckets: default_histogram_buckets(),
            show_histogram: false,
            show_percentiles: false,
            json_output: None,
            export_patterns: None,
        }
    }
}

impl OutputConfig {
    pub fn histogram_max(&self) -> Duration {
        Duration::from_micros(self.histogram_max_us)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = &self.workload;
        writeln!(f, "Store: {}", self.store.kind)?;
        if self.store.simulated_latency_us > 0 || self.store.failure_rate > 0.0 {
            writeln!(
                f,
                "  Simulated latency: {}us, failure rate: {}",
                self.store.simulated_latency_us, self.store.failure_rate
            )?;
        }
        writeln!(
            f,
            "Workload: mode {}, {} loops x {} iterations",
            w.mode, w.loops, w.iterations
        )?;
        writeln!(f, "  Key size: {} bytes, data size: {} bytes", w.key_size, w.data_size)?;
        if w.tps {
            writeln!(
                f,
                "  TPS run: {} minute(s), {} worker(s), delay {}",
                w.duration_minutes, w.workers, w.delay
            )?;
        } else {
            writeln!(
                f,
                "  Test cycles: {}",
                if w.parallel { "parallel" } else { "sequential" }
            )?;
        }
        writeln!(f, "  Verify: {}", w.verify)?;
        if w.stored_patterns {
            writeln!(f, "  Stored patterns: {} file(s)", self.store.patterns.len())?;
        }
        if let Some(ref session) = w.session {
            writeln!(f, "  Reusing session: {}", session)?;
        }
        write!(
            f,
            "Histogram: {} buckets up to {}us",
            self.output.histogram_buckets, self.output.histogram_max_us
        )
    }
}
