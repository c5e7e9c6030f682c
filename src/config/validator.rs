//! Configuration validation

use super::*;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::warn;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_workload(&config.workload)?;
    validate_store(&config.store, &config.workload)?;
    validate_output(&config.output)?;
    validate_workers(config)?;
    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    if workload.loops == 0 || workload.loops > MAX_LOOPS {
        anyhow::bail!("loops must be between 1 and {}, got {}", MAX_LOOPS, workload.loops);
    }
    if workload.iterations == 0 || workload.iterations > MAX_LOOPS {
        anyhow::bail!(
            "iterations must be between 1 and {}, got {}",
            MAX_LOOPS,
            workload.iterations
        );
    }

    if workload.data_size == 0 {
        anyhow::bail!("data_size must be at least 1 byte");
    }

    // Generated keys must fit their unique "{loop}.{iter}." prefix
    if !workload.stored_patterns {
        let prefix = workload.corpus_shape().longest_prefix();
        if workload.key_size < prefix {
            anyhow::bail!(
                "key_size {} is too small: keys need at least {} bytes for {} loops x {} iterations",
                workload.key_size,
                prefix,
                workload.loops,
                workload.iterations
            );
        }
    }

    workload
        .delay()
        .with_context(|| format!("Invalid delay: {:?}", workload.delay))?;

    if workload.tps {
        if workload.duration_minutes < 1 {
            anyhow::bail!("TPS runs need duration_minutes >= 1");
        }
        if Instant::now().checked_add(workload.duration()).is_none() {
            anyhow::bail!(
                "duration_minutes {} is too large",
                workload.duration_minutes
            );
        }
        if workload.parallel {
            warn!("parallel only affects test cycles; ignored for TPS runs");
        }
    }

    if let Some(ref session) = workload.session {
        if session.is_empty() || session.contains(':') {
            anyhow::bail!("session name {:?} must be non-empty and contain no ':'", session);
        }
    }

    Ok(())
}

/// Validate store configuration
pub fn validate_store(store: &StoreConfig, workload: &WorkloadConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&store.failure_rate) {
        anyhow::bail!(
            "failure_rate must be between 0.0 and 1.0, got {}",
            store.failure_rate
        );
    }

    if workload.stored_patterns {
        if store.patterns.is_empty() {
            anyhow::bail!("stored patterns requested but no pattern files are configured");
        }
        if store.patterns.len() > MAX_LOOPS {
            anyhow::bail!("at most {} pattern files are supported", MAX_LOOPS);
        }
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.histogram_buckets == 0 {
        anyhow::bail!("histogram_buckets must be at least 1");
    }

    // Bucket width is whole nanoseconds
    let max_ns = output.histogram_max_us.saturating_mul(1_000);
    if max_ns / (output.histogram_buckets as u64) == 0 {
        anyhow::bail!(
            "histogram of {}us split into {} buckets has a bucket width below 1ns",
            output.histogram_max_us,
            output.histogram_buckets
        );
    }

    Ok(())
}

/// Worker count must be 1 or match the number of partitions
pub fn validate_workers(config: &Config) -> Result<()> {
    let workload = &config.workload;
    let partitions = partition_count(config);

    if workload.workers != 1 && workload.workers != partitions {
        anyhow::bail!(
            "incompatible worker and loop count: workers ({}) must be 1 or equal to the number of loops ({})",
            workload.workers,
            partitions
        );
    }
    Ok(())
}

/// Number of partitions the run will have
pub fn partition_count(config: &Config) -> usize {
    if config.workload.stored_patterns {
        config.store.patterns.len()
    } else {
        config.workload.loops
    }
}
