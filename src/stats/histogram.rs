//! Percentile histogram using HdrHistogram
//!
//! The fixed-bucket [`LatencyDistribution`](super::distribution::LatencyDistribution)
//! answers "how many samples fell in each band". This wrapper answers the
//! complementary question of tail latency (p50, p99, p99.9) with bounded
//! relative error.
//!
//! # Example
//!
//! ```
//! use dbpulse::stats::histogram::PercentileHistogram;
//! use std::time::Duration;
//!
//! let mut hist = PercentileHistogram::new().unwrap();
//! hist.record(Duration::from_micros(100));
//! hist.record(Duration::from_micros(150));
//! hist.record(Duration::from_micros(200));
//!
//! let p50 = hist.percentile(50.0).unwrap();
//! assert!(p50 >= Duration::from_micros(149) && p50 <= Duration::from_micros(151));
//! ```

use super::StatsError;
use hdrhistogram::Histogram;
use serde::Serialize;
use std::time::Duration;

/// Highest trackable value: 1 hour in nanoseconds
const MAX_TRACKABLE_NS: u64 = 3_600_000_000_000;

/// Percentiles reported for every metric stream
pub const REPORTED_PERCENTILES: [f64; 4] = [50.0, 90.0, 99.0, 99.9];

/// Latency histogram wrapper
///
/// Tracks 1 ns .. 1 hour with 3 significant digits, so any value is accurate
/// to within 0.1%. Recording and querying are O(1).
#[derive(Debug, Clone)]
pub struct PercentileHistogram {
    histogram: Histogram<u64>,
}

/// Summary of a percentile histogram, in nanoseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PercentileSummary {
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
}

impl PercentileHistogram {
    pub fn new() -> Result<Self, StatsError> {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKABLE_NS, 3)
            .map_err(|e| StatsError::Histogram(e.to_string()))?;
        Ok(Self { histogram })
    }

    /// Record a latency sample, clamped into the trackable range
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(MAX_TRACKABLE_NS);
        let value = nanos.clamp(1, MAX_TRACKABLE_NS);
        // In range after clamping; saturating either way
        let _ = self.histogram.record(value);
    }

    /// Value at `percentile` (0.0 - 100.0), or None when empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(
            self.histogram.value_at_percentile(percentile),
        ))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_nanos(self.histogram.max()))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Fold another histogram's samples into this one
    pub fn merge(&mut self, other: &PercentileHistogram) -> Result<(), StatsError> {
        self.histogram
            .add(&other.histogram)
            .map_err(|e| StatsError::Histogram(e.to_string()))
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }

    pub fn summary(&self) -> PercentileSummary {
        if self.is_empty() {
            return PercentileSummary::default();
        }
        let at = |p: f64| self.histogram.value_at_percentile(p);
        PercentileSummary {
            count: self.histogram.len(),
            min_ns: self.histogram.min(),
            max_ns: self.histogram.max(),
            p50_ns: at(REPORTED_PERCENTILES[0]),
            p90_ns: at(REPORTED_PERCENTILES[1]),
            p99_ns: at(REPORTED_PERCENTILES[2]),
            p999_ns: at(REPORTED_PERCENTILES[3]),
        }
    }
}
