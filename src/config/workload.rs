//! Workload enums shared by the config file and the CLI

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which operations a run performs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WorkloadMode {
    /// TPS: random reads. Cycles: write then read back
    #[serde(rename = "r")]
    Read,
    /// Writes only
    #[serde(rename = "w")]
    Write,
    /// TPS: 50/50 random reads and writes. Cycles: write then read back
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
}

impl WorkloadMode {
    /// Whether a test cycle reads back what it wrote
    pub fn reads(&self) -> bool {
        !matches!(self, WorkloadMode::Write)
    }
}

impl fmt::Display for WorkloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadMode::Read => write!(f, "r"),
            WorkloadMode::Write => write!(f, "w"),
            WorkloadMode::ReadWrite => write!(f, "rw"),
        }
    }
}

/// Data store driver
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_reads() {
        assert!(WorkloadMode::Read.reads());
        assert!(WorkloadMode::ReadWrite.reads());
        assert!(!WorkloadMode::Write.reads());
    }

    #[test]
    fn test_mode_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: WorkloadMode,
        }
        let parsed: Wrapper = ::toml::from_str("mode = \"w\"").unwrap();
        assert_eq!(parsed.mode, WorkloadMode::Write);
        assert_eq!(WorkloadMode::ReadWrite.to_string(), "rw");
        assert_eq!(StoreKind::Memory.to_string(), "memory");
    }
}
