//! Latency statistics
//!
//! Every timed operation feeds one metric stream. A stream combines three
//! views of the same samples:
//!
//! - **[`mean::MeanVariance`]**: running count, mean, variance, standard deviation
//! - **[`distribution::LatencyDistribution`]**: fixed equal-width buckets plus outliers
//! - **[`histogram::PercentileHistogram`]**: tail percentiles (p50 .. p99.9)
//!
//! Streams are shared by reference between workers; each view guards its own
//! state with a mutex so one `record` never blocks on an unrelated view.
//!
//! # Example
//!
//! ```
//! use dbpulse::stats::OperationStats;
//! use std::time::Duration;
//!
//! let writes = OperationStats::new("write", Duration::from_millis(10), 20).unwrap();
//! writes.record(Duration::from_micros(120));
//! writes.record(Duration::from_micros(80));
//!
//! assert_eq!(writes.count(), 2);
//! assert_eq!(writes.tracker().mean(), Duration::from_micros(100));
//! ```

pub mod aggregator;
pub mod distribution;
pub mod histogram;
pub mod mean;

use distribution::{DistributionSnapshot, LatencyDistribution};
use histogram::{PercentileHistogram, PercentileSummary};
use mean::{MeanVariance, MeanVarianceState};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Errors raised while building statistics structures
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("latency distribution needs at least one bucket")]
    NoBuckets,

    #[error("bucket width is 0ns for maximum {maximum:?} split into {buckets} buckets")]
    ZeroBucketWidth { maximum: Duration, buckets: usize },

    #[error("percentile histogram error: {0}")]
    Histogram(String),
}

/// One metric stream (reads or writes)
#[derive(Debug)]
pub struct OperationStats {
    name: &'static str,
    tracker: MeanVariance,
    distribution: LatencyDistribution,
    percentiles: Mutex<PercentileHistogram>,
}

/// Serializable view of a metric stream
#[derive(Debug, Clone, Serialize)]
pub struct StreamSnapshot {
    pub name: &'static str,
    pub summary: MeanVarianceState,
    pub distribution: DistributionSnapshot,
    pub percentiles: PercentileSummary,
}

impl OperationStats {
    /// Build a stream whose bucket table spans `[0, histogram_max)` in `buckets` buckets
    pub fn new(
        name: &'static str,
        histogram_max: Duration,
        buckets: usize,
    ) -> Result<Self, StatsError> {
        Ok(Self {
            name,
            tracker: MeanVariance::new(),
            distribution: LatencyDistribution::new(histogram_max, buckets)?,
            percentiles: Mutex::new(PercentileHistogram::new()?),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Feed one elapsed time into every view
    pub fn record(&self, sample: Duration) {
        self.tracker.add(sample);
        self.distribution.add(sample);
        self.percentiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(sample);
    }

    pub fn count(&self) -> u64 {
        self.tracker.count()
    }

    pub fn tracker(&self) -> &MeanVariance {
        &self.tracker
    }

    pub fn distribution(&self) -> &LatencyDistribution {
        &self.distribution
    }

    pub fn percentiles(&self) -> PercentileSummary {
        self.percentiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }

    pub fn reset(&self) {
        self.tracker.reset();
        self.distribution.reset();
        self.percentiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            name: self.name,
            summary: self.tracker.snapshot(),
            distribution: self.distribution.snapshot(),
            percentiles: self.percentiles(),
        }
    }
}
