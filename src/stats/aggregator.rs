//! Result aggregation
//!
//! Folds per-worker and per-cycle results into run totals. Latency samples are
//! already merged in the shared metric streams; this module only deals with
//! counters, elapsed time and throughput.
//!
//! # Example
//!
//! ```
//! use dbpulse::stats::aggregator::RunAggregator;
//! use dbpulse::worker::WorkerResult;
//! use std::time::Duration;
//!
//! let mut aggregator = RunAggregator::new();
//! aggregator.add_worker(WorkerResult {
//!     worker_id: 0,
//!     partition: 0,
//!     operations: 600,
//!     elapsed: Duration::from_secs(60),
//!     read_errors: 1,
//!     write_errors: 0,
//! });
//!
//! let summary = aggregator.finish(Duration::from_secs(60));
//! assert_eq!(summary.operations, 600);
//! assert_eq!(summary.throughput, 10.0);
//! ```

use crate::util::time::calculate_rate;
use crate::worker::cycle::CycleResult;
use crate::worker::WorkerResult;
use std::time::Duration;

/// Totals of a TPS run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub workers: usize,
    pub operations: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    /// Wall-clock time of the whole run
    pub elapsed: Duration,
    /// Operations per second over `elapsed`
    pub throughput: f64,
    /// Per-worker results, ordered by worker then partition
    pub per_worker: Vec<WorkerResult>,
}

/// Collects worker results for one TPS run
#[derive(Debug, Default)]
pub struct RunAggregator {
    results: Vec<WorkerResult>,
    extra_write_errors: u64,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_worker(&mut self, result: WorkerResult) {
        self.results.push(result);
    }

    /// Write errors that happened outside the workers (e.g. prepopulation)
    pub fn add_write_errors(&mut self, errors: u64) {
        self.extra_write_errors += errors;
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    pub fn finish(mut self, elapsed: Duration) -> RunSummary {
        self.results
            .sort_unstable_by_key(|r| (r.worker_id, r.partition));

        let mut workers: Vec<usize> = self.results.iter().map(|r| r.worker_id).collect();
        workers.dedup();

        let operations = self.results.iter().map(|r| r.operations).sum();
        RunSummary {
            workers: workers.len(),
            operations,
            read_errors: self.results.iter().map(|r| r.read_errors).sum(),
            write_errors: self.results.iter().map(|r| r.write_errors).sum::<u64>()
                + self.extra_write_errors,
            elapsed,
            throughput: calculate_rate(operations, elapsed),
            per_worker: self.results,
        }
    }
}

/// Totals of a set of test cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycles: Vec<CycleResult>,
    pub write_errors: u64,
    pub read_errors: u64,
    pub elapsed: Duration,
}

impl CycleSummary {
    /// Fold cycle results, ordered by partition
    pub fn from_results(mut cycles: Vec<CycleResult>, elapsed: Duration) -> Self {
        cycles.sort_unstable_by_key(|c| c.partition);
        Self {
            write_errors: cycles.iter().map(|c| c.write_errors).sum(),
            read_errors: cycles.iter().map(|c| c.read_errors).sum(),
            cycles,
            elapsed,
        }
    }
}
