//! Test-cycle runner
//!
//! A cycle writes every record of one partition in offset order and, unless
//! the mode is write-only, reads every record back in the same order and
//! verifies it. Unlike TPS workers a cycle is bounded by the partition size,
//! not by time.

use super::executor::{timed_read, timed_write};
use super::log_failure;
use crate::config::workload::WorkloadMode;
use crate::corpus::Coordinate;
use crate::session::Session;
use crate::util::time::format_duration;
use std::time::{Duration, Instant};
use tracing::{info, info_span};

/// Outcome of one partition's cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleResult {
    pub partition: usize,
    pub write_errors: u64,
    pub read_errors: u64,
    pub write_elapsed: Duration,
    /// Zero when the cycle did not read
    pub read_elapsed: Duration,
}

/// Write then (optionally) read back every record of `partition`
pub fn run_cycle(session: &Session, partition: usize, mode: WorkloadMode) -> CycleResult {
    let records = session.corpus().partition_len(partition);
    let mut result = CycleResult {
        partition,
        ..Default::default()
    };

    let _span = info_span!("cycle", partition).entered();
    info!(records, "write test started");
    let start = Instant::now();
    for offset in 0..records {
        if let Err(e) = timed_write(session, Coordinate::new(partition, offset)) {
            result.write_errors += 1;
            log_failure("write", &e);
        }
    }
    result.write_elapsed = start.elapsed();
    info!(
        errors = result.write_errors,
        "write test completed ({} elapsed)",
        format_duration(result.write_elapsed)
    );

    if !mode.reads() {
        return result;
    }

    info!(records, "read and verify started");
    let start = Instant::now();
    for offset in 0..records {
        if let Err(e) = timed_read(session, Coordinate::new(partition, offset)) {
            result.read_errors += 1;
            log_failure("read", &e);
        }
    }
    result.read_elapsed = start.elapsed();
    info!(
        errors = result.read_errors,
        "read test completed ({} elapsed)",
        format_duration(result.read_elapsed)
    );

    result
}
