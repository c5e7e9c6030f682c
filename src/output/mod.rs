//! Report output
//!
//! - [`text`]: console report printed to stdout
//! - [`json`]: machine-readable report written with `--json-output`

pub mod json;
pub mod text;

use crate::stats::aggregator::{CycleSummary, RunSummary};
use std::time::Duration;

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Tps(RunSummary),
    Cycles(CycleSummary),
}

impl RunOutcome {
    pub fn read_errors(&self) -> u64 {
        match self {
            RunOutcome::Tps(s) => s.read_errors,
            RunOutcome::Cycles(s) => s.read_errors,
        }
    }

    pub fn write_errors(&self) -> u64 {
        match self {
            RunOutcome::Tps(s) => s.write_errors,
            RunOutcome::Cycles(s) => s.write_errors,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            RunOutcome::Tps(s) => s.elapsed,
            RunOutcome::Cycles(s) => s.elapsed,
        }
    }
}
