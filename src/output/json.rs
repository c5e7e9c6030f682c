//! JSON output formatting
//!
//! One report per run: when and where it ran, the merged configuration, the
//! run totals and a snapshot of both metric streams (tracker state, bucket
//! table and percentiles).

use super::RunOutcome;
use crate::config::Config;
use crate::session::Session;
use crate::stats::StreamSnapshot;
use crate::util::time::format_duration;
use crate::Result;
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both seconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonDuration {
    pub seconds: f64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            seconds: d.as_secs_f64(),
            human: format_duration(d),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonWorker {
    pub worker_id: usize,
    pub partition: usize,
    pub operations: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub elapsed: JsonDuration,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCycle {
    pub partition: usize,
    pub write_errors: u64,
    pub read_errors: u64,
    pub write_elapsed: JsonDuration,
    pub read_elapsed: JsonDuration,
}

/// Run totals, tagged by run kind
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JsonRun {
    Tps {
        workers: usize,
        operations: u64,
        read_errors: u64,
        write_errors: u64,
        elapsed: JsonDuration,
        throughput: f64,
        per_worker: Vec<JsonWorker>,
    },
    Cycles {
        read_errors: u64,
        write_errors: u64,
        elapsed: JsonDuration,
        cycles: Vec<JsonCycle>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub version: String,
    pub session: String,
    pub reused_session: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub config: Config,
    pub run: JsonRun,
    pub streams: Vec<StreamSnapshot>,
}

/// Build the report for a finished run
pub fn build_report(config: &Config, session: &Session, outcome: &RunOutcome) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        session: session.name().to_string(),
        reused_session: session.is_reused(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        hostname: get_hostname(),
        config: config.clone(),
        run: build_run(outcome),
        streams: vec![session.writes().snapshot(), session.reads().snapshot()],
    }
}

fn build_run(outcome: &RunOutcome) -> JsonRun {
    match outcome {
        RunOutcome::Tps(summary) => JsonRun::Tps {
            workers: summary.workers,
            operations: summary.operations,
            read_errors: summary.read_errors,
            write_errors: summary.write_errors,
            elapsed: JsonDuration::from_duration(summary.elapsed),
            throughput: summary.throughput,
            per_worker: summary
                .per_worker
                .iter()
                .map(|r| JsonWorker {
                    worker_id: r.worker_id,
                    partition: r.partition,
                    operations: r.operations,
                    read_errors: r.read_errors,
                    write_errors: r.write_errors,
                    elapsed: JsonDuration::from_duration(r.elapsed),
                })
                .collect(),
        },
        RunOutcome::Cycles(summary) => JsonRun::Cycles {
            read_errors: summary.read_errors,
            write_errors: summary.write_errors,
            elapsed: JsonDuration::from_duration(summary.elapsed),
            cycles: summary
                .cycles
                .iter()
                .map(|c| JsonCycle {
                    partition: c.partition,
                    write_errors: c.write_errors,
                    read_errors: c.read_errors,
                    write_elapsed: JsonDuration::from_duration(c.write_elapsed),
                    read_elapsed: JsonDuration::from_duration(c.read_elapsed),
                })
                .collect(),
        },
    }
}

/// Write the report to a file
pub fn write_json_output(output_path: &Path, report: &JsonReport, pretty: bool) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(&mut writer, report)?;
    } else {
        serde_json::to_writer(&mut writer, report)?;
    }
    writer.flush()?;

    Ok(())
}

fn get_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::session_with;
    use crate::stats::aggregator::{CycleSummary, RunSummary};
    use crate::worker::cycle::CycleResult;
    use crate::worker::WorkerResult;

    #[test]
    fn test_tps_report() {
        let (session, _) = session_with(1, 1);
        session.writes().record(Duration::from_micros(5));
        let outcome = RunOutcome::Tps(RunSummary {
            workers: 1,
            operations: 10,
            elapsed: Duration::from_millis(1500),
            throughput: 6.5,
            per_worker: vec![WorkerResult {
                operations: 10,
                ..Default::default()
            }],
            ..Default::default()
        });

        let report = build_report(&Config::default(), &session, &outcome);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["session"], "TESTSESSN1");
        assert_eq!(value["run"]["kind"], "tps");
        assert_eq!(value["run"]["operations"], 10);
        assert_eq!(value["run"]["elapsed"]["seconds"], 1.5);
        assert_eq!(value["run"]["per_worker"][0]["operations"], 10);
        assert_eq!(value["config"]["workload"]["mode"], "rw");
        assert_eq!(value["streams"][0]["name"], "write");
        assert_eq!(value["streams"][0]["summary"]["count"], 1);
        assert_eq!(value["streams"][1]["distribution"]["total"], 0);
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_cycle_report_file() {
        let (session, _) = session_with(1, 1);
        let outcome = RunOutcome::Cycles(CycleSummary::from_results(
            vec![CycleResult {
                partition: 0,
                read_errors: 2,
                ..Default::default()
            }],
            Duration::from_secs(2),
        ));
        let report = build_report(&Config::default(), &session, &outcome);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_output(&path, &report, true).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["run"]["kind"], "cycles");
        assert_eq!(value["run"]["read_errors"], 2);
        assert_eq!(value["run"]["cycles"][0]["read_elapsed"]["human"], "0ns");
        assert_eq!(value["reused_session"], false);
    }

    #[test]
    fn test_unwritable_path() {
        let (session, _) = session_with(1, 1);
        let outcome = RunOutcome::Cycles(CycleSummary::default());
        let report = build_report(&Config::default(), &session, &outcome);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        assert!(write_json_output(&path, &report, false).is_err());
    }
}
