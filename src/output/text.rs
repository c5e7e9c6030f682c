//! Human-readable text output

use super::RunOutcome;
use crate::config::{Config, OutputConfig};
use crate::session::Session;
use crate::stats::aggregator::{CycleSummary, RunSummary};
use crate::stats::histogram::PercentileSummary;
use crate::stats::OperationStats;
use crate::util::time::{format_duration, format_rate};
use std::fmt::Write;
use std::time::Duration;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Print the run banner
pub fn print_banner(config: &Config, session: &str) {
    print!("{}", render_banner(config, session));
}

/// Print the results of a finished run
pub fn print_results(outcome: &RunOutcome, session: &Session, output: &OutputConfig) {
    println!("{}", RULE);
    println!("                    TEST RESULTS");
    println!("{}", RULE);
    match outcome {
        RunOutcome::Tps(summary) => print!("{}", render_tps(summary)),
        RunOutcome::Cycles(summary) => print!("{}", render_cycles(summary)),
    }
    print!("{}", render_streams(outcome, session, output));
    println!("{}", RULE);
}

pub fn render_banner(config: &Config, session: &str) -> String {
    let workload = &config.workload;
    format!(
        "dbpulse v{}\nMode: {}, Iterations: {}, Key Size: {} bytes, Data Size: {} bytes, Session-ID: {}\n",
        env!("CARGO_PKG_VERSION"),
        workload.mode,
        workload.iterations,
        workload.key_size,
        workload.data_size,
        session
    )
}

pub fn render_tps(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Read Errors: {}", summary.read_errors);
    let _ = writeln!(out, "Write Errors: {}", summary.write_errors);
    let _ = writeln!(out, "Total Operations: {}", summary.operations);
    let _ = writeln!(out, "Time Elapsed: {:.2} seconds", summary.elapsed.as_secs_f64());
    let _ = writeln!(out, "TPS Rate: {}", format_rate(summary.throughput));

    if summary.per_worker.len() > 1 {
        let _ = writeln!(out);
        for result in &summary.per_worker {
            let _ = writeln!(
                out,
                "  Worker {:>3} / partition {:>3}: {} ops, {} read errors, {} write errors",
                result.worker_id,
                result.partition,
                result.operations,
                result.read_errors,
                result.write_errors
            );
        }
    }
    let _ = writeln!(out);
    out
}

pub fn render_cycles(summary: &CycleSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    for cycle in &summary.cycles {
        let _ = write!(
            out,
            "Loop {}: write {} ({} errors)",
            cycle.partition + 1,
            format_duration(cycle.write_elapsed),
            cycle.write_errors
        );
        if !cycle.read_elapsed.is_zero() {
            let _ = write!(
                out,
                ", read {} ({} errors)",
                format_duration(cycle.read_elapsed),
                cycle.read_errors
            );
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(
        out,
        "{} cycles in {}",
        summary.cycles.len(),
        format_duration(summary.elapsed)
    );
    out
}

/// Per-stream statistics, plus bucket tables and percentiles when enabled
pub fn render_streams(outcome: &RunOutcome, session: &Session, output: &OutputConfig) -> String {
    let mut out = String::new();
    let streams = [
        ("Write", session.writes(), outcome.write_errors()),
        ("Read", session.reads(), outcome.read_errors()),
    ];

    let _ = writeln!(out);
    for (label, stream, errors) in &streams {
        let _ = writeln!(out, "{} Statistics ({} errors):", label, errors);
        let _ = writeln!(out, "    {}", stream.tracker());
    }

    if output.show_histogram {
        for (label, stream, _) in &streams {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} Latency Distribution:", label);
            let _ = write!(out, "{}", stream.distribution().snapshot());
        }
    }

    if output.show_percentiles {
        let _ = writeln!(out);
        for (label, stream, _) in &streams {
            let _ = writeln!(out, "{} Percentiles: {}", label, render_percentiles(stream));
        }
    }
    let _ = writeln!(out);
    out
}

fn render_percentiles(stream: &OperationStats) -> String {
    let summary: PercentileSummary = stream.percentiles();
    if summary.count == 0 {
        return "no samples".to_string();
    }
    let ns = |n: u64| format_duration(Duration::from_nanos(n));
    format!(
        "min {}, p50 {}, p90 {}, p99 {}, p99.9 {}, max {}",
        ns(summary.min_ns),
        ns(summary.p50_ns),
        ns(summary.p90_ns),
        ns(summary.p99_ns),
        ns(summary.p999_ns),
        ns(summary.max_ns)
    )
}
