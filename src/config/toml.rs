//! Configuration file parsing and CLI merging

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse a configuration file; `.json` files are read as JSON, anything else as TOML
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        parse_json_string(&contents)
    } else {
        parse_toml_string(&contents)
    };
    parsed.with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config =
        ::toml::from_str(contents).context("Failed to parse TOML configuration")?;
    Ok(config)
}

/// Parse JSON configuration from string
pub fn parse_json_string(contents: &str) -> Result<Config> {
    let config: Config =
        serde_json::from_str(contents).context("Failed to parse JSON configuration")?;
    Ok(config)
}

/// Build the effective configuration: file (if any), then CLI overrides
pub fn build_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_config_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}

/// Merge CLI arguments with file configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Workload shape
    if let Some(loops) = cli.loops {
        config.workload.loops = loops;
    }
    if let Some(iterations) = cli.iterations {
        config.workload.iterations = iterations;
    }
    if let Some(mode) = cli.mode {
        config.workload.mode = cli_convert::convert_mode(mode);
    }
    if let Some(ref size) = cli.key_size {
        config.workload.key_size = cli_convert::parse_size(size).context("Invalid key size")?;
    }
    if let Some(ref size) = cli.data_size {
        config.workload.data_size = cli_convert::parse_size(size).context("Invalid data size")?;
    }
    if cli.parallel {
        config.workload.parallel = true;
    }
    if cli.no_data_check {
        config.workload.verify = false;
    }
    if let Some(seed) = cli.seed {
        config.workload.seed = Some(seed);
    }

    // TPS
    if cli.tps {
        config.workload.tps = true;
    }
    if let Some(minutes) = cli.duration_minutes {
        config.workload.duration_minutes = minutes;
    }
    if let Some(ref delay) = cli.delay {
        config.workload.delay = delay.clone();
    }
    if let Some(workers) = cli.workers {
        config.workload.workers = workers;
    }

    // Store
    if let Some(store) = cli.store {
        config.store.kind = cli_convert::convert_store(store);
    }
    if cli.stored {
        config.workload.stored_patterns = true;
    }
    if !cli.patterns.is_empty() {
        config.store.patterns = cli.patterns.clone();
    }
    if let Some(ref session) = cli.session {
        config.workload.session = Some(session.clone());
    }
    if let Some(latency) = cli.simulated_latency_us {
        config.store.simulated_latency_us = latency;
    }
    if let Some(rate) = cli.failure_rate {
        config.store.failure_rate = rate;
    }

    // Output
    if let Some(max) = cli.histogram_max_us {
        config.output.histogram_max_us = max;
    }
    if let Some(buckets) = cli.histogram_buckets {
        config.output.histogram_buckets = buckets;
    }
    if cli.show_histogram {
        config.output.show_histogram = true;
    }
    if cli.show_percentiles {
        config.output.show_percentiles = true;
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if let Some(ref dir) = cli.export_patterns {
        config.output.export_patterns = Some(dir.clone());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_toml() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[store]
kind = "memory"
patterns = ["p0.json", "p1.json"]
simulated_latency_us = 50
failure_rate = 0.01

[workload]
loops = 2
iterations = 300
mode = "r"
key_size = 24
data_size = 512
tps = true
duration_minutes = 1
delay = "5ms"
workers = 2
verify = false
seed = 42

[output]
histogram_max_us = 5000
histogram_buckets = 10
show_percentiles = true
"#;
        let config = parse_toml_string(toml_str).unwrap();
        assert_eq!(config.store.patterns.len(), 2);
        assert_eq!(config.store.simulated_latency_us, 50);
        assert_eq!(config.workload.loops, 2);
        assert_eq!(config.workload.mode, WorkloadMode::Read);
        assert_eq!(config.workload.workers, 2);
        assert!(!config.workload.verify);
        assert_eq!(config.workload.seed, Some(42));
        assert_eq!(config.output.histogram_buckets, 10);
        assert!(config.output.show_percentiles);
        assert!(!config.output.show_histogram);
    }

    #[test]
    fn test_parse_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"workload": {{"loops": 3, "mode": "w"}}, "store": {{"patterns": ["a.json"]}}}}"#
        )
        .unwrap();

        let config = parse_config_file(file.path()).unwrap();
        assert_eq!(config.workload.loops, 3);
        assert_eq!(config.workload.mode, WorkloadMode::Write);
        assert_eq!(config.workload.iterations, 1000);
        assert_eq!(config.store.patterns, vec![PathBuf::from("a.json")]);
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[workload]\nloops = \"many\"\n").unwrap();

        let err = parse_config_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
        assert!(parse_config_file(Path::new("/nonexistent/dbpulse.toml")).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let base = parse_toml_string("[workload]\nloops = 8\niterations = 50\nmode = \"r\"\n").unwrap();
        let cli = Cli::try_parse_from([
            "dbpulse", "--loops", "2", "--dbs", "2k", "--ndc", "--json-output", "out.json",
        ])
        .unwrap();

        let config = merge_cli_with_config(&cli, base).unwrap();
        assert_eq!(config.workload.loops, 2);
        assert_eq!(config.workload.iterations, 50);
        assert_eq!(config.workload.mode, WorkloadMode::Read);
        assert_eq!(config.workload.data_size, 2048);
        assert!(!config.workload.verify);
        assert_eq!(config.output.json_output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_bad_size_flag() {
        let cli = Cli::try_parse_from(["dbpulse", "--kbs", "huge"]).unwrap();
        assert!(merge_cli_with_config(&cli, Config::default()).is_err());
    }

    #[test]
    fn test_build_config_without_file() {
        let cli = Cli::try_parse_from(["dbpulse", "--tps", "--dur", "1"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert!(config.workload.tps);
        assert_eq!(config.workload.duration_minutes, 1);
    }
}
