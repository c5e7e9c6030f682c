//! Run coordinator
//!
//! Starts the workers for a run, waits for all of them and folds their
//! results. Two kinds of run exist:
//!
//! - **TPS**: time-bounded workers ([`run_tps`]), one per partition or a
//!   single worker visiting every partition in turn
//! - **Cycles**: one write/read pass per partition ([`run_cycles`]),
//!   sequential or concurrent
//!
//! Workers run on scoped threads borrowing the session, so nothing outlives
//! the call. Results come back as values; deciding what a failed run means
//! for the process is left to the caller.

use crate::config::workload::WorkloadMode;
use crate::config::WorkloadConfig;
use crate::session::Session;
use crate::stats::aggregator::{CycleSummary, RunAggregator, RunSummary};
use crate::util::time::format_duration;
use crate::worker::cycle::{run_cycle, CycleResult};
use crate::worker::executor::timed_write;
use crate::worker::{log_failure, Worker, WorkerResult, WorkloadPolicy};
use crate::Result;
use anyhow::{anyhow, ensure};
use crossbeam::channel;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

/// Pause between starting concurrent cycles
pub const CYCLE_STAGGER: Duration = Duration::from_millis(200);

/// Settings of a TPS run
#[derive(Debug, Clone, PartialEq)]
pub struct TpsSettings {
    pub policy: WorkloadPolicy,
    /// 1, or one worker per partition
    pub workers: usize,
    /// How long each partition is driven
    pub duration: Duration,
    pub delay: Duration,
    pub seed: Option<u64>,
}

impl TpsSettings {
    pub fn from_config(workload: &WorkloadConfig) -> Result<Self> {
        Ok(Self {
            policy: workload.mode.into(),
            workers: workload.workers,
            duration: workload.duration(),
            delay: workload.delay()?,
            seed: workload.seed,
        })
    }
}

/// Settings of a cycle run
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub mode: WorkloadMode,
    pub parallel: bool,
    pub stagger: Duration,
}

impl CycleSettings {
    pub fn from_config(workload: &WorkloadConfig) -> Self {
        Self {
            mode: workload.mode,
            parallel: workload.parallel,
            stagger: CYCLE_STAGGER,
        }
    }
}

/// Outcome of a full write pass over the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub records: u64,
    pub write_errors: u64,
    pub elapsed: Duration,
}

/// Write every corpus record once, registering each successful write
///
/// An index that already holds coordinates (loaded stored patterns) is left
/// as is, so no coordinate is registered twice. Write latencies go to the
/// session's write stream like any other write.
pub fn populate(session: &Session) -> PopulateSummary {
    let _span = info_span!("populate").entered();
    let corpus = session.corpus();
    let register = session.index().is_empty();
    info!(records = corpus.len(), register, "populating store");

    let start = Instant::now();
    let mut summary = PopulateSummary::default();
    for coordinate in corpus.coordinates() {
        summary.records += 1;
        match timed_write(session, coordinate) {
            Ok(_) if register => session.index().record(coordinate),
            Ok(_) => {}
            Err(e) => {
                summary.write_errors += 1;
                log_failure("write", &e);
            }
        }
    }
    summary.elapsed = start.elapsed();

    info!(
        records = summary.records,
        errors = summary.write_errors,
        "store populated ({} elapsed)",
        format_duration(summary.elapsed)
    );
    summary
}

/// Run time-bounded workers over every partition
///
/// With one worker the partitions are driven one after another, each for the
/// full duration. Otherwise worker `i` drives partition `i` and all of them
/// run at once.
pub fn run_tps(session: &Session, settings: &TpsSettings) -> Result<RunSummary> {
    let partitions = session.corpus().partitions();
    ensure!(
        settings.workers == 1 || settings.workers == partitions,
        "workers must be 1 or equal to the number of partitions ({}), got {}",
        partitions,
        settings.workers
    );

    let mut aggregator = RunAggregator::new();
    if settings.policy == WorkloadPolicy::ReadOnly && !session.is_reused() {
        let populated = populate(session);
        aggregator.add_write_errors(populated.write_errors);
    }

    let assignments: Vec<Vec<usize>> = if settings.workers == 1 {
        vec![(0..partitions).collect()]
    } else {
        (0..partitions).map(|p| vec![p]).collect()
    };

    info!(
        workers = assignments.len(),
        partitions,
        policy = ?settings.policy,
        "TPS run started ({} per partition)",
        format_duration(settings.duration)
    );

    let start = Instant::now();
    let results = thread::scope(|scope| -> Result<Vec<Vec<WorkerResult>>> {
        let mut pending = Vec::with_capacity(assignments.len());

        for (worker_id, assigned) in assignments.into_iter().enumerate() {
            let (tx, rx) = channel::bounded(1);
            let mut worker = Worker::new(worker_id, settings.policy, settings.duration)
                .with_delay(settings.delay)
                .with_seed(settings.seed);

            let handle = scope.spawn(move || {
                let results: Vec<WorkerResult> = assigned
                    .into_iter()
                    .map(|partition| worker.run(session, partition))
                    .collect();
                // capacity 1 and a single send, so this never blocks
                let _ = tx.send(results);
            });
            pending.push((worker_id, handle, rx));
        }

        let mut collected = Vec::with_capacity(pending.len());
        for (worker_id, handle, rx) in pending {
            handle
                .join()
                .map_err(|_| anyhow!("worker {} panicked", worker_id))?;
            let results = rx
                .recv()
                .map_err(|_| anyhow!("worker {} exited without reporting", worker_id))?;
            debug!(worker = worker_id, runs = results.len(), "worker joined");
            collected.push(results);
        }
        Ok(collected)
    })?;

    for result in results.into_iter().flatten() {
        aggregator.add_worker(result);
    }
    let summary = aggregator.finish(start.elapsed());

    info!(
        operations = summary.operations,
        read_errors = summary.read_errors,
        write_errors = summary.write_errors,
        "TPS run completed ({:.2} ops/s)",
        summary.throughput
    );
    Ok(summary)
}

/// Run one write/read cycle per partition
pub fn run_cycles(session: &Session, settings: &CycleSettings) -> Result<CycleSummary> {
    let partitions = session.corpus().partitions();
    info!(
        partitions,
        mode = %settings.mode,
        parallel = settings.parallel,
        "test cycles started"
    );

    let start = Instant::now();
    let cycles = if settings.parallel {
        thread::scope(|scope| -> Result<Vec<CycleResult>> {
            let mut handles = Vec::with_capacity(partitions);
            for partition in 0..partitions {
                if partition > 0 && !settings.stagger.is_zero() {
                    thread::sleep(settings.stagger);
                }
                handles.push((
                    partition,
                    scope.spawn(move || run_cycle(session, partition, settings.mode)),
                ));
            }

            handles
                .into_iter()
                .map(|(partition, handle)| {
                    handle
                        .join()
                        .map_err(|_| anyhow!("cycle for partition {} panicked", partition))
                })
                .collect()
        })?
    } else {
        (0..partitions)
            .map(|partition| run_cycle(session, partition, settings.mode))
            .collect()
    };

    let summary = CycleSummary::from_results(cycles, start.elapsed());
    info!(
        write_errors = summary.write_errors,
        read_errors = summary.read_errors,
        "test cycles completed ({} elapsed)",
        format_duration(summary.elapsed)
    );
    Ok(summary)
}
