//! Worker thread implementation
//!
//! A worker drives one corpus partition against the store until its deadline,
//! following one of three policies:
//!
//! - **Write-only**: sequential sweep over the partition, wrapping around
//! - **Read-only**: uniformly random offset in the partition, read and verify
//! - **Mixed**: fair coin per iteration; heads writes a random offset of the
//!   partition and registers it, tails reads a random registered coordinate
//!   from any partition (skipped while nothing has been written)
//!
//! The deadline is polled before every operation, so a zero duration performs
//! no operations at all. Failures are counted and logged, never fatal.
//!
//! # Example
//!
//! ```no_run
//! use dbpulse::worker::{Worker, WorkloadPolicy};
//! # use dbpulse::session::Session;
//! # use std::time::Duration;
//! # fn demo(session: &Session) {
//! let mut worker = Worker::new(0, WorkloadPolicy::WriteOnly, Duration::from_secs(60))
//!     .with_delay(Duration::from_millis(5))
//!     .with_seed(Some(42));
//! let result = worker.run(session, 0);
//! println!("{} ops, {} write errors", result.operations, result.write_errors);
//! # }
//! ```

pub mod cycle;
pub mod executor;

use crate::config::workload::WorkloadMode;
use crate::corpus::index::IndexError;
use crate::corpus::Coordinate;
use crate::session::Session;
use executor::{timed_read, timed_write, OperationError};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn};

/// What a TPS worker does each iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadPolicy {
    WriteOnly,
    ReadOnly,
    Mixed,
}

impl From<WorkloadMode> for WorkloadPolicy {
    fn from(mode: WorkloadMode) -> Self {
        match mode {
            WorkloadMode::Write => WorkloadPolicy::WriteOnly,
            WorkloadMode::Read => WorkloadPolicy::ReadOnly,
            WorkloadMode::ReadWrite => WorkloadPolicy::Mixed,
        }
    }
}

/// Outcome of one worker run over one partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerResult {
    pub worker_id: usize,
    pub partition: usize,
    /// Attempted operations (successful or not)
    pub operations: u64,
    pub elapsed: Duration,
    pub read_errors: u64,
    pub write_errors: u64,
}

/// One TPS worker
#[derive(Debug)]
pub struct Worker {
    id: usize,
    policy: WorkloadPolicy,
    duration: Duration,
    delay: Duration,
    rng: Xoshiro256PlusPlus,
}

impl Worker {
    pub fn new(id: usize, policy: WorkloadPolicy, duration: Duration) -> Self {
        Self {
            id,
            policy,
            duration,
            delay: Duration::ZERO,
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Pause before each operation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Deterministic random choices when a seed is given
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.rng = Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(self.id as u64));
        }
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Drive `partition` until the deadline
    pub fn run(&mut self, session: &Session, partition: usize) -> WorkerResult {
        let mut result = WorkerResult {
            worker_id: self.id,
            partition,
            ..Default::default()
        };

        let records = session.corpus().partition_len(partition);
        if records == 0 {
            warn!(worker = self.id, partition, "partition is empty, nothing to do");
            return result;
        }

        let _span = info_span!("worker", id = self.id).entered();
        debug!(partition, policy = ?self.policy, "worker started");
        let start = Instant::now();
        let deadline = deadline_after(start, self.duration);
        let mut next_offset = 0usize;

        while deadline.map_or(true, |d| Instant::now() < d) {
            match self.policy {
                WorkloadPolicy::WriteOnly => {
                    let at = Coordinate::new(partition, next_offset);
                    next_offset = (next_offset + 1) % records;
                    self.pause();
                    self.write(session, at, &mut result);
                }
                WorkloadPolicy::ReadOnly => {
                    let at = Coordinate::new(partition, self.rng.gen_range(0..records));
                    self.pause();
                    self.read(session, at, &mut result);
                }
                WorkloadPolicy::Mixed => {
                    if self.rng.gen_bool(0.5) {
                        let at = Coordinate::new(partition, self.rng.gen_range(0..records));
                        self.pause();
                        self.write(session, at, &mut result);
                    } else {
                        match session.index().pick_random(&mut self.rng) {
                            Ok(at) => self.read(session, at, &mut result),
                            Err(IndexError::Empty) => continue,
                        }
                    }
                }
            }
        }

        result.elapsed = start.elapsed();
        debug!(
            partition,
            operations = result.operations,
            read_errors = result.read_errors,
            write_errors = result.write_errors,
            "worker finished"
        );
        result
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }

    fn write(&self, session: &Session, at: Coordinate, result: &mut WorkerResult) {
        result.operations += 1;
        match timed_write(session, at) {
            Ok(_) => {
                if self.policy == WorkloadPolicy::Mixed {
                    session.index().record(at);
                }
            }
            Err(e) => {
                result.write_errors += 1;
                log_failure("write", &e);
            }
        }
    }

    fn read(&self, session: &Session, at: Coordinate, result: &mut WorkerResult) {
        result.operations += 1;
        if let Err(e) = timed_read(session, at) {
            result.read_errors += 1;
            log_failure("read", &e);
        }
    }
}

/// Deadline `duration` after `start`, or `None` when it lies beyond what
/// `Instant` can represent (the run then never times out)
pub fn deadline_after(start: Instant, duration: Duration) -> Option<Instant> {
    start.checked_add(duration)
}

/// Log a failed operation; the caller's span says who ran it
pub(crate) fn log_failure(op: &str, error: &OperationError) {
    let at = error.coordinate();
    warn!(
        partition = at.partition,
        offset = at.offset,
        op,
        "{}",
        error
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::tests::session_with;
    use std::sync::{Arc, Mutex};

    const SHORT: Duration = Duration::from_millis(50);

    #[test]
    fn test_policy_from_mode() {
        assert_eq!(WorkloadPolicy::from(WorkloadMode::Write), WorkloadPolicy::WriteOnly);
        assert_eq!(WorkloadPolicy::from(WorkloadMode::Read), WorkloadPolicy::ReadOnly);
        assert_eq!(WorkloadPolicy::from(WorkloadMode::ReadWrite), WorkloadPolicy::Mixed);
    }

    #[test]
    fn test_zero_duration_does_nothing() {
        let (session, store) = session_with(1, 10);
        session.prepare().unwrap();

        for policy in [WorkloadPolicy::WriteOnly, WorkloadPolicy::ReadOnly, WorkloadPolicy::Mixed] {
            let result = Worker::new(0, policy, Duration::ZERO).run(&session, 0);
            assert_eq!(result.operations, 0);
        }
        assert_eq!(store.write_count(), 0);
        assert_eq!(session.writes().count(), 0);
    }

    #[test]
    fn test_write_only_sweeps_partition() {
        let (session, store) = session_with(2, 5);
        session.prepare().unwrap();

        let result = Worker::new(3, WorkloadPolicy::WriteOnly, SHORT).run(&session, 1);
        assert_eq!(result.worker_id, 3);
        assert_eq!(result.partition, 1);
        assert!(result.operations >= 5);
        assert_eq!(result.write_errors, 0);
        assert_eq!(result.read_errors, 0);
        assert!(result.elapsed >= SHORT);
        // only partition 1 was touched, every offset of it
        assert_eq!(store.len(), 5);
        assert_eq!(session.writes().count(), result.operations);
        // write-only runs do not register coordinates
        assert!(session.index().is_empty());
    }

    #[test]
    fn test_read_only_after_prepopulation() {
        let (session, _) = session_with(1, 8);
        session.prepare().unwrap();
        for offset in 0..8 {
            timed_write(&session, Coordinate::new(0, offset)).unwrap();
        }

        let result = Worker::new(0, WorkloadPolicy::ReadOnly, SHORT)
            .with_seed(Some(1))
            .run(&session, 0);
        assert!(result.operations > 0);
        assert_eq!(result.read_errors, 0);
        assert_eq!(session.reads().count(), result.operations);
    }

    #[test]
    fn test_read_only_counts_missing_records_once() {
        let (session, _) = session_with(1, 4);
        session.prepare().unwrap();

        let result = Worker::new(0, WorkloadPolicy::ReadOnly, SHORT).run(&session, 0);
        assert!(result.operations > 0);
        assert_eq!(result.read_errors, result.operations);
    }

    #[test]
    fn test_mixed_registers_successful_writes() {
        let (session, store) = session_with(1, 20);
        session.prepare().unwrap();

        let result = Worker::new(0, WorkloadPolicy::Mixed, SHORT)
            .with_seed(Some(9))
            .run(&session, 0);
        assert!(result.operations > 0);
        assert_eq!(result.read_errors, 0);
        assert_eq!(result.write_errors, 0);
        assert_eq!(session.index().len() as u64, store.write_count());
        assert_eq!(
            session.reads().count() + session.writes().count(),
            result.operations
        );
    }

    #[test]
    fn test_mixed_with_failing_store_never_reads() {
        let (session, store) = session_with(1, 20);
        session.prepare().unwrap();
        store.set_should_fail(true);

        let result = Worker::new(0, WorkloadPolicy::Mixed, SHORT).run(&session, 0);
        assert!(result.write_errors > 0);
        assert_eq!(result.read_errors, 0);
        assert_eq!(result.write_errors, result.operations);
        assert!(session.index().is_empty());
    }

    #[test]
    fn test_deadline_overflow() {
        let start = Instant::now();
        assert_eq!(
            deadline_after(start, Duration::from_secs(1)),
            Some(start + Duration::from_secs(1))
        );
        assert_eq!(deadline_after(start, Duration::MAX), None);
        assert_eq!(
            deadline_after(start, Duration::from_secs(u64::MAX / 60 * 60)),
            None
        );
    }

    #[test]
    fn test_failures_logged_in_worker_span() {
        let (session, store) = session_with(1, 4);
        session.prepare().unwrap();
        store.set_should_fail(true);

        let (subscriber, output) = capture_logs();
        tracing::subscriber::with_default(subscriber, || {
            Worker::new(7, WorkloadPolicy::WriteOnly, Duration::from_millis(5)).run(&session, 0)
        });

        let logs = output.contents();
        assert!(logs.contains("worker{id=7}"), "{}", logs);
        assert!(logs.contains("partition=0"), "{}", logs);
    }

    #[test]
    fn test_delay_limits_operations() {
        let (session, _) = session_with(1, 10);
        session.prepare().unwrap();

        let result = Worker::new(0, WorkloadPolicy::WriteOnly, Duration::from_millis(100))
            .with_delay(Duration::from_millis(20))
            .run(&session, 0);
        assert!(result.operations >= 1);
        assert!(result.operations <= 6, "ops: {}", result.operations);
    }

    /// Log lines written while a test runs, without ANSI colours
    #[derive(Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn capture_logs() -> (impl tracing::Subscriber + Send + Sync, CapturedLogs) {
        let output = CapturedLogs::default();
        let writer = output.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (subscriber, output)
    }
}
