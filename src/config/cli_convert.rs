//! CLI to Config conversion utilities

use crate::config::cli;
use crate::config::workload;
use anyhow::{Context, Result};
use std::time::Duration;

/// Parse a size string (e.g., "1024", "4k", "1M") to bytes
pub fn parse_size(s: &str) -> Result<usize> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with('k') || s.ends_with("kb") {
        (s.trim_end_matches("kb").trim_end_matches('k'), 1024usize)
    } else if s.ends_with('m') || s.ends_with("mb") {
        (s.trim_end_matches("mb").trim_end_matches('m'), 1024 * 1024)
    } else {
        (s.as_str(), 1)
    };

    let num: usize = num_str
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size too large: {}", s))
}

/// Parse a composite delay (e.g., "0", "50ms", "1s500ms", "250us", "10ns")
///
/// Components may appear in any order and repeat; they are summed. A bare
/// number is read as seconds.
pub fn parse_delay(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        anyhow::bail!("Invalid delay format: empty string");
    }
    if let Ok(seconds) = s.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let mut total = Duration::ZERO;
    let mut rest = s.as_str();
    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            anyhow::bail!("Invalid delay format: {} (expected a number at {:?})", s, rest);
        }
        let value: u64 = rest[..digits]
            .parse()
            .with_context(|| format!("Invalid delay format: {}", s))?;
        rest = &rest[digits..];

        let unit_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        let component = match &rest[..unit_len] {
            "s" => Duration::from_secs(value),
            "ms" => Duration::from_millis(value),
            "us" => Duration::from_micros(value),
            "ns" => Duration::from_nanos(value),
            unit => anyhow::bail!("Invalid delay unit {:?} in {} (use s, ms, us, ns)", unit, s),
        };
        rest = &rest[unit_len..];

        total = total
            .checked_add(component)
            .with_context(|| format!("Delay overflows: {}", s))?;
    }

    Ok(total)
}

/// Convert CLI ModeArg to workload WorkloadMode
pub fn convert_mode(mode: cli::ModeArg) -> workload::WorkloadMode {
    match mode {
        cli::ModeArg::Read => workload::WorkloadMode::Read,
        cli::ModeArg::Write => workload::WorkloadMode::Write,
        cli::ModeArg::ReadWrite => workload::WorkloadMode::ReadWrite,
    }
}

/// Convert CLI StoreArg to workload StoreKind
pub fn convert_store(store: cli::StoreArg) -> workload::StoreKind {
    match store {
        cli::StoreArg::Memory => workload::StoreKind::Memory,
    }
}
